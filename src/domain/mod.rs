// Domain layer - Records, validation and query results
pub mod command;
pub mod error;
pub mod telemetry;
pub mod validation;
pub mod window;
