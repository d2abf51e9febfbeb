// In-memory telemetry store - Development and test backend
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::{TelemetryRecord, WriteOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

type VehicleSeries = Arc<RwLock<BTreeMap<DateTime<Utc>, TelemetryRecord>>>;

/// Per-vehicle ordered series. A write only locks the series of its own vehicle.
#[derive(Default)]
pub struct InMemoryTelemetryStore {
    vehicles: DashMap<String, VehicleSeries>,
}

impl InMemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn series(&self, vehicle_id: &str) -> Option<VehicleSeries> {
        self.vehicles.get(vehicle_id).map(|s| s.clone())
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn write(&self, record: &TelemetryRecord) -> Result<WriteOutcome, TelemetryError> {
        // Clone the Arc out so the DashMap shard guard is released before locking
        let series = self
            .vehicles
            .entry(record.vehicle_id.clone())
            .or_default()
            .clone();

        let mut series = series.write();
        match series.entry(record.timestamp) {
            Entry::Occupied(_) => Ok(WriteOutcome::Skipped),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(WriteOutcome::Inserted)
            }
        }
    }

    async fn latest(&self, vehicle_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError> {
        Ok(self
            .series(vehicle_id)
            .and_then(|series| series.read().last_key_value().map(|(_, r)| r.clone())))
    }

    async fn range_query(
        &self,
        vehicle_id: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        Ok(self
            .series(vehicle_id)
            .map(|series| series.read().range(window_start..).map(|(_, r)| r.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::fixtures::{base_time, record_at};
    use chrono::Duration;

    #[tokio::test]
    async fn test_first_write_wins() {
        let store = InMemoryTelemetryStore::new();
        let first = record_at("veh-001", base_time());
        let mut second = first.clone();
        second.temperature_c = -5.0;

        assert_eq!(store.write(&first).await.unwrap(), WriteOutcome::Inserted);
        assert_eq!(store.write(&second).await.unwrap(), WriteOutcome::Skipped);
        assert_eq!(store.latest("veh-001").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_range_query_orders_and_filters() {
        let store = InMemoryTelemetryStore::new();
        for offset in [3, 0, 2, 1] {
            store
                .write(&record_at("veh-001", base_time() + Duration::minutes(offset)))
                .await
                .unwrap();
        }

        let window = store
            .range_query("veh-001", base_time() + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 3);
        assert!(window.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(window[0].timestamp, base_time() + Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_unknown_vehicle() {
        let store = InMemoryTelemetryStore::new();
        assert!(store.latest("ghost").await.unwrap().is_none());
        assert!(store.range_query("ghost", base_time()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_writes_insert_once() {
        let store = Arc::new(InMemoryTelemetryStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut record = record_at("veh-race", base_time());
                record.range_km = i as f64;
                store.write(&record).await.unwrap()
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == WriteOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.range_query("veh-race", base_time()).await.unwrap().len(), 1);
    }
}
