// Application layer - Use cases and ports
pub mod acquisition_service;
pub mod alert_service;
pub mod export_service;
pub mod session_service;
pub mod telemetry_client;
