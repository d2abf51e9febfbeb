//! Vehicle fleet telemetry: idempotent per-vehicle storage plus trailing-window
//! statistics and robust anomaly detection.
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
