// Infrastructure layer - External dependencies and adapters
pub mod bus_subscriber;
pub mod config;
pub mod memory_store;
pub mod mqtt_bus;
pub mod sqlite_store;

use crate::application::telemetry_store::TelemetryStore;
use crate::domain::error::TelemetryError;
use self::config::{StorageBackend, StorageSettings};
use std::sync::Arc;

/// Build the store selected by configuration
pub fn open_store(settings: &StorageSettings) -> Result<Arc<dyn TelemetryStore>, TelemetryError> {
    match settings.backend {
        StorageBackend::Sqlite => Ok(Arc::new(sqlite_store::SqliteTelemetryStore::open(
            &settings.path,
            settings.busy_timeout(),
        )?)),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory telemetry store; data is lost on restart");
            Ok(Arc::new(memory_store::InMemoryTelemetryStore::new()))
        }
    }
}
