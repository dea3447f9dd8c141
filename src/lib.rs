// pitwall-telemetry - console client for the team's telemetry backend
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
