// Store trait for telemetry persistence
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::{TelemetryRecord, WriteOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Persist a record unless `(vehicle_id, timestamp)` is already stored.
    /// First write wins: a colliding write reports `Skipped` and changes nothing.
    async fn write(&self, record: &TelemetryRecord) -> Result<WriteOutcome, TelemetryError>;

    /// Record with the greatest timestamp for the vehicle
    async fn latest(&self, vehicle_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError>;

    /// All records for the vehicle with `timestamp >= window_start`, ascending
    async fn range_query(
        &self,
        vehicle_id: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>, TelemetryError>;
}
