// Error taxonomy shared by the store, the window engines and the query layer
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TelemetryError {
    /// No record for the vehicle, or none inside the requested window.
    #[error("no telemetry found for vehicle {0}")]
    NotFound(String),

    /// Aggregator or detector was handed zero records.
    #[error("window is empty")]
    EmptyWindow,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("vehicle_id must not be empty")]
    EmptyVehicleId,

    #[error("invalid ISO8601 timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("battery_pct {0} is outside [0, 100]")]
    BatteryOutOfRange(f64),

    #[error("battery_pct {0} is not a whole number")]
    BatteryNotWhole(f64),

    #[error("gps.lat {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("gps.lon {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("status must be \"moving\" or \"stopped\", got {0:?}")]
    InvalidStatus(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid telemetry: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] TelemetryError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("message bus is disabled")]
    BusDisabled,

    #[error("failed to publish command: {0}")]
    Publish(String),
}
