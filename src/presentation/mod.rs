// Presentation layer - view models and console rendering
pub mod console;
pub mod dashboard;
