// Query service - Composes the store with the window engines
use crate::application::anomaly_detector::AnomalyDetector;
use crate::application::telemetry_store::TelemetryStore;
use crate::application::window_aggregator::WindowAggregator;
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::TelemetryRecord;
use crate::domain::window::{AnomalyReport, WindowStats};
use crate::infrastructure::config::QuerySettings;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn TelemetryStore>,
    settings: QuerySettings,
    aggregator: WindowAggregator,
}

impl QueryService {
    pub fn new(store: Arc<dyn TelemetryStore>, settings: QuerySettings) -> Self {
        Self {
            store,
            settings,
            aggregator: WindowAggregator::new(),
        }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub async fn latest(&self, vehicle_id: &str) -> Result<TelemetryRecord, TelemetryError> {
        self.store
            .latest(vehicle_id)
            .await?
            .ok_or_else(|| TelemetryError::NotFound(vehicle_id.to_string()))
    }

    pub async fn stats(&self, vehicle_id: &str, minutes: u32) -> Result<WindowStats, TelemetryError> {
        self.stats_at(vehicle_id, minutes, Utc::now()).await
    }

    /// Summary statistics over `[now - minutes, ..)`. `now` is also reported as
    /// the window end so both bounds come from the same instant.
    pub async fn stats_at(
        &self,
        vehicle_id: &str,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<WindowStats, TelemetryError> {
        let window_start = now - Duration::minutes(i64::from(minutes));
        let window = self.window(vehicle_id, window_start).await?;
        let stats = self
            .aggregator
            .summarize(&window, &self.settings.stats_metrics)?;

        Ok(WindowStats {
            window_start,
            window_end: now,
            count: window.len(),
            stats,
        })
    }

    pub async fn anomalies(
        &self,
        vehicle_id: &str,
        minutes: u32,
        threshold: Option<f64>,
    ) -> Result<AnomalyReport, TelemetryError> {
        self.anomalies_at(vehicle_id, minutes, threshold, Utc::now())
            .await
    }

    pub async fn anomalies_at(
        &self,
        vehicle_id: &str,
        minutes: u32,
        threshold: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<AnomalyReport, TelemetryError> {
        let window_start = now - Duration::minutes(i64::from(minutes));
        let window = self.window(vehicle_id, window_start).await?;

        let detector =
            AnomalyDetector::new(threshold.unwrap_or(self.settings.anomaly_threshold));
        let anomalies = detector.detect(&window, &self.settings.anomaly_metrics)?;

        tracing::debug!(
            "Anomaly scan for {}: {} records, {} flags",
            vehicle_id,
            window.len(),
            anomalies.len()
        );

        Ok(AnomalyReport {
            vehicle_id: vehicle_id.to_string(),
            anomalies,
        })
    }

    /// Fetch the window once; an empty window is NotFound, never handed to the engines
    async fn window(
        &self,
        vehicle_id: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        let window = self.store.range_query(vehicle_id, window_start).await?;
        if window.is_empty() {
            return Err(TelemetryError::NotFound(vehicle_id.to_string()));
        }
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::fixtures::{base_time, record_at};
    use crate::domain::telemetry::{Metric, WriteOutcome};
    use crate::infrastructure::memory_store::InMemoryTelemetryStore;
    use async_trait::async_trait;

    fn service_with(store: Arc<dyn TelemetryStore>) -> QueryService {
        QueryService::new(store, QuerySettings::default())
    }

    #[tokio::test]
    async fn test_latest_not_found() {
        let service = service_with(Arc::new(InMemoryTelemetryStore::new()));
        let err = service.latest("veh-test-nodata").await.unwrap_err();
        assert_eq!(err, TelemetryError::NotFound("veh-test-nodata".to_string()));
    }

    #[tokio::test]
    async fn test_stats_over_trailing_window() {
        let store = Arc::new(InMemoryTelemetryStore::new());
        let now = base_time();

        let current = record_at("veh-test-stats", now);
        let mut earlier = record_at("veh-test-stats", now - Duration::minutes(1));
        earlier.speed_kmh = 60.0;
        earlier.temperature_c = 70.0;
        earlier.battery_pct = 80;
        // outside a 5 minute window
        let mut stale = record_at("veh-test-stats", now - Duration::minutes(30));
        stale.speed_kmh = 500.0;

        for record in [&current, &earlier, &stale] {
            store.write(record).await.unwrap();
        }

        let service = service_with(store);
        let stats = service.stats_at("veh-test-stats", 5, now).await.unwrap();

        assert_eq!(stats.count, 2);
        assert_eq!(stats.window_end, now);
        assert_eq!(stats.window_start, now - Duration::minutes(5));
        let speed = stats.stats[&Metric::SpeedKmh];
        assert_eq!(speed.min, 42.7);
        assert_eq!(speed.max, 60.0);
        assert!((speed.mean - 51.35).abs() < 1e-9);
        assert_eq!(stats.stats[&Metric::BatteryPct].max, 80.0);
    }

    #[tokio::test]
    async fn test_empty_window_is_not_found() {
        let store = Arc::new(InMemoryTelemetryStore::new());
        let now = base_time();
        store
            .write(&record_at("veh-001", now - Duration::hours(3)))
            .await
            .unwrap();

        let service = service_with(store);
        assert_eq!(
            service.stats_at("veh-001", 60, now).await.unwrap_err(),
            TelemetryError::NotFound("veh-001".to_string())
        );
        assert_eq!(
            service.anomalies_at("veh-001", 60, None, now).await.unwrap_err(),
            TelemetryError::NotFound("veh-001".to_string())
        );
    }

    #[tokio::test]
    async fn test_anomalies_flag_outlier() {
        let store = Arc::new(InMemoryTelemetryStore::new());
        let now = base_time();
        for (i, temperature) in [50.0, 51.0, 52.0, 53.0, 54.0, 500.0].iter().enumerate() {
            let mut record = record_at("veh-hot", now - Duration::minutes(10 - i as i64));
            record.temperature_c = *temperature;
            store.write(&record).await.unwrap();
        }

        let service = service_with(store);
        let report = service.anomalies_at("veh-hot", 60, None, now).await.unwrap();
        assert_eq!(report.vehicle_id, "veh-hot");
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].record.temperature_c, 500.0);
        assert_eq!(report.anomalies[0].threshold, 3.0);

        // a looser threshold silences it
        let report = service
            .anomalies_at("veh-hot", 60, Some(1000.0), now)
            .await
            .unwrap();
        assert!(report.anomalies.is_empty());
    }

    struct UnavailableStore;

    #[async_trait]
    impl TelemetryStore for UnavailableStore {
        async fn write(&self, _record: &TelemetryRecord) -> Result<WriteOutcome, TelemetryError> {
            Err(TelemetryError::StorageUnavailable("offline".to_string()))
        }

        async fn latest(&self, _vehicle_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError> {
            Err(TelemetryError::StorageUnavailable("offline".to_string()))
        }

        async fn range_query(
            &self,
            _vehicle_id: &str,
            _window_start: DateTime<Utc>,
        ) -> Result<Vec<TelemetryRecord>, TelemetryError> {
            Err(TelemetryError::StorageUnavailable("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_storage_errors_propagate_unchanged() {
        let service = service_with(Arc::new(UnavailableStore));
        let expected = TelemetryError::StorageUnavailable("offline".to_string());
        assert_eq!(service.latest("veh-001").await.unwrap_err(), expected);
        assert_eq!(service.stats("veh-001", 60).await.unwrap_err(), expected);
        assert_eq!(service.anomalies("veh-001", 60, None).await.unwrap_err(), expected);
    }
}
