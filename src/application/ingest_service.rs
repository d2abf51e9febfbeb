// Ingest service - Single write path for HTTP and message-bus ingestion
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::error::{IngestError, TelemetryError};
use crate::domain::telemetry::{TelemetryRecord, WriteOutcome};
use crate::domain::validation::TelemetryPayload;
use std::sync::Arc;

#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn TelemetryStore>,
}

impl IngestService {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Validate a wire payload and persist it
    pub async fn ingest(&self, payload: TelemetryPayload) -> Result<WriteOutcome, IngestError> {
        let record = payload.validate()?;
        Ok(self.ingest_record(&record).await?)
    }

    pub async fn ingest_record(&self, record: &TelemetryRecord) -> Result<WriteOutcome, TelemetryError> {
        let outcome = self.store.write(record).await?;
        match outcome {
            WriteOutcome::Inserted => {
                tracing::debug!("Stored telemetry for {} at {}", record.vehicle_id, record.timestamp);
            }
            WriteOutcome::Skipped => {
                tracing::info!(
                    "Duplicate telemetry for {} at {} ignored",
                    record.vehicle_id,
                    record.timestamp
                );
            }
        }
        Ok(outcome)
    }
}
