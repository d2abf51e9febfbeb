// Anomaly detector - Robust z-score outliers per metric
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::{Metric, TelemetryRecord};
use crate::domain::window::Anomaly;

pub const DEFAULT_THRESHOLD: f64 = 3.0;
pub const MAD_SCALE: f64 = 1.4826;
/// Stands in for a zero MAD, so divergence from a constant series scores large but finite
pub const MAD_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Flag every (record, metric) pair whose |z| exceeds the threshold.
    ///
    /// Output is grouped by metric in the order given, then by window order.
    pub fn detect(
        &self,
        window: &[TelemetryRecord],
        metrics: &[Metric],
    ) -> Result<Vec<Anomaly>, TelemetryError> {
        if window.is_empty() {
            return Err(TelemetryError::EmptyWindow);
        }

        let mut anomalies = Vec::new();
        for metric in metrics {
            let values: Vec<f64> = window.iter().map(|r| metric.value(r)).collect();
            let scores = robust_z_scores(&values);

            for (record, score) in window.iter().zip(scores) {
                if score.abs() > self.threshold {
                    anomalies.push(Anomaly {
                        record: record.clone(),
                        metric: *metric,
                        score,
                        threshold: self.threshold,
                    });
                }
            }
        }

        Ok(anomalies)
    }
}

/// Robust z-score of every value, in input order
pub fn robust_z_scores(values: &[f64]) -> Vec<f64> {
    let center = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();

    let mut mad = median(&deviations);
    if mad == 0.0 {
        mad = MAD_EPSILON;
    }

    let scale = MAD_SCALE * mad;
    values.iter().map(|v| (v - center) / scale).collect()
}

/// Median of a non-empty slice; mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::fixtures::{base_time, record_at};
    use chrono::Duration;

    fn window_with_temperatures(temperatures: &[f64]) -> Vec<TelemetryRecord> {
        temperatures
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut record = record_at("veh-001", base_time() + Duration::seconds(i as i64));
                record.temperature_c = *t;
                record
            })
            .collect()
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[7.0]), 7.0);
    }

    #[test]
    fn test_outlier_is_flagged() {
        let window = window_with_temperatures(&[50.0, 51.0, 52.0, 53.0, 54.0, 500.0]);
        let anomalies = AnomalyDetector::default()
            .detect(&window, &[Metric::TemperatureC])
            .unwrap();

        assert_eq!(anomalies.len(), 1);
        let anomaly = &anomalies[0];
        assert_eq!(anomaly.record.temperature_c, 500.0);
        assert_eq!(anomaly.metric, Metric::TemperatureC);
        assert!(anomaly.score > 3.0);
        assert_eq!(anomaly.threshold, 3.0);
    }

    #[test]
    fn test_outlier_score_value() {
        // median 52.5, MAD 1.5
        let scores = robust_z_scores(&[50.0, 51.0, 52.0, 53.0, 54.0, 500.0]);
        let expected = (500.0 - 52.5) / (MAD_SCALE * 1.5);
        assert!((scores[5] - expected).abs() < 1e-9);
        assert!(scores[..5].iter().all(|s| s.abs() <= 3.0));
    }

    #[test]
    fn test_negative_outlier_has_negative_score() {
        let window = window_with_temperatures(&[50.0, 51.0, 52.0, 53.0, 54.0, -400.0]);
        let anomalies = AnomalyDetector::default()
            .detect(&window, &[Metric::TemperatureC])
            .unwrap();
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].score < -3.0);
    }

    #[test]
    fn test_singleton_window_never_flags() {
        let mut record = record_at("veh-001", base_time());
        record.speed_kmh = 1e9;
        record.temperature_c = -1e9;
        let anomalies = AnomalyDetector::new(0.0)
            .detect(&[record], &Metric::ALL)
            .unwrap();
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_constant_metric_never_flags() {
        let window = window_with_temperatures(&[21.5; 8]);
        let anomalies = AnomalyDetector::default()
            .detect(&window, &Metric::ALL)
            .unwrap();
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_divergence_from_constant_scores_large() {
        let window = window_with_temperatures(&[20.0, 20.0, 20.0, 20.0, 20.1]);
        let anomalies = AnomalyDetector::default()
            .detect(&window, &[Metric::TemperatureC])
            .unwrap();
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].score.is_finite());
        assert!(anomalies[0].score > 1e3);
    }

    #[test]
    fn test_metrics_are_independent() {
        let mut window = window_with_temperatures(&[50.0, 51.0, 52.0, 53.0, 54.0, 500.0]);
        window[5].speed_kmh = 900.0;
        window[2].battery_pct = 0;
        for (i, record) in window.iter_mut().enumerate() {
            if i != 2 {
                record.battery_pct = 50 + i as u8;
            }
        }

        let anomalies = AnomalyDetector::default()
            .detect(&window, &[Metric::TemperatureC, Metric::SpeedKmh, Metric::BatteryPct])
            .unwrap();

        let flagged: Vec<(Metric, f64)> = anomalies
            .iter()
            .map(|a| (a.metric, a.record.temperature_c))
            .collect();
        assert_eq!(
            flagged,
            vec![
                (Metric::TemperatureC, 500.0),
                (Metric::SpeedKmh, 500.0),
                (Metric::BatteryPct, 52.0),
            ]
        );
    }

    #[test]
    fn test_detection_is_deterministic() {
        let window = window_with_temperatures(&[10.0, 80.0, 11.0, 12.0, 13.0, 9.5, 300.0]);
        let detector = AnomalyDetector::default();
        let first = detector.detect(&window, &Metric::ALL).unwrap();
        let second = detector.detect(&window, &Metric::ALL).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_window_is_rejected() {
        let result = AnomalyDetector::default().detect(&[], &[Metric::SpeedKmh]);
        assert_eq!(result, Err(TelemetryError::EmptyWindow));
    }
}
