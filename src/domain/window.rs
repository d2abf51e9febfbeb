// Window query results
use super::telemetry::{Metric, TelemetryRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    #[serde(rename = "avg")]
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStats {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub count: usize,
    pub stats: BTreeMap<Metric, MetricSummary>,
}

/// A record flagged for one metric. A record can appear once per metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    #[serde(flatten)]
    pub record: TelemetryRecord,
    #[serde(rename = "anomaly_variable")]
    pub metric: Metric,
    #[serde(rename = "anomaly_score")]
    pub score: f64,
    #[serde(rename = "anomaly_threshold")]
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub vehicle_id: String,
    pub anomalies: Vec<Anomaly>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::fixtures::{base_time, record_at};

    #[test]
    fn test_anomaly_flattens_record_fields() {
        let anomaly = Anomaly {
            record: record_at("veh-001", base_time()),
            metric: Metric::TemperatureC,
            score: 12.5,
            threshold: 3.0,
        };
        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["vehicle_id"], "veh-001");
        assert_eq!(json["ts"], "2025-09-18T10:15:30Z");
        assert_eq!(json["anomaly_variable"], "temperature_c");
        assert_eq!(json["anomaly_score"], 12.5);
        assert_eq!(json["anomaly_threshold"], 3.0);
    }

    #[test]
    fn test_stats_use_metric_names_and_avg() {
        let mut stats = BTreeMap::new();
        stats.insert(
            Metric::SpeedKmh,
            MetricSummary {
                min: 1.0,
                max: 3.0,
                mean: 2.0,
            },
        );
        let window = WindowStats {
            window_start: base_time(),
            window_end: base_time(),
            count: 2,
            stats,
        };
        let json = serde_json::to_value(&window).unwrap();
        assert_eq!(json["stats"]["speed_kmh"]["avg"], 2.0);
        assert_eq!(json["count"], 2);
    }
}
