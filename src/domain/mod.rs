// Domain layer - Pure data and rules, no I/O
pub mod alert;
pub mod sensor;
pub mod session;
pub mod telemetry;
