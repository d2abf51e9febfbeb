// Window aggregator - min/max/mean per metric over an ordered window
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::{Metric, TelemetryRecord};
use crate::domain::window::MetricSummary;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowAggregator;

impl WindowAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Summarise every requested metric over the window.
    ///
    /// An empty window is rejected: an all-zero summary would be
    /// indistinguishable from a real all-zero window.
    pub fn summarize(
        &self,
        window: &[TelemetryRecord],
        metrics: &[Metric],
    ) -> Result<BTreeMap<Metric, MetricSummary>, TelemetryError> {
        if window.is_empty() {
            return Err(TelemetryError::EmptyWindow);
        }

        Ok(metrics
            .iter()
            .map(|metric| (*metric, Self::summarize_metric(window, *metric)))
            .collect())
    }

    fn summarize_metric(window: &[TelemetryRecord], metric: Metric) -> MetricSummary {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0_f64;

        for record in window {
            let value = metric.value(record);
            min = min.min(value);
            max = max.max(value);
            sum += value;
        }

        MetricSummary {
            min,
            max,
            mean: sum / window.len() as f64,
        }
    }
}
