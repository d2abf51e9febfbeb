// Telemetry data domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gps {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Moving,
    Stopped,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Moving => "moving",
            VehicleStatus::Stopped => "stopped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "moving" => Some(VehicleStatus::Moving),
            "stopped" => Some(VehicleStatus::Stopped),
            _ => None,
        }
    }
}

/// One observation from one vehicle at one instant.
///
/// `(vehicle_id, timestamp)` is the identity of a record. Records are only
/// ever built by the validator, so every value here is already in range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub vehicle_id: String,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub speed_kmh: f64,
    pub temperature_c: f64,
    pub battery_pct: u8,
    pub range_km: f64,
    pub odometer_km: f64,
    pub gps: Gps,
    pub smoke_detected: bool,
    pub status: VehicleStatus,
}

/// Result of a store write. `Skipped` means the key already existed and the
/// stored record was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Skipped,
}

/// Numeric fields a window can be reduced over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SpeedKmh,
    TemperatureC,
    BatteryPct,
    RangeKm,
    OdometerKm,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::SpeedKmh,
        Metric::TemperatureC,
        Metric::BatteryPct,
        Metric::RangeKm,
        Metric::OdometerKm,
    ];

    /// Metrics summarised and scanned by the reference deployment
    pub const DEFAULT_SET: [Metric; 3] = [Metric::SpeedKmh, Metric::TemperatureC, Metric::BatteryPct];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::SpeedKmh => "speed_kmh",
            Metric::TemperatureC => "temperature_c",
            Metric::BatteryPct => "battery_pct",
            Metric::RangeKm => "range_km",
            Metric::OdometerKm => "odometer_km",
        }
    }

    pub fn value(&self, record: &TelemetryRecord) -> f64 {
        match self {
            Metric::SpeedKmh => record.speed_kmh,
            Metric::TemperatureC => record.temperature_c,
            Metric::BatteryPct => f64::from(record.battery_pct),
            Metric::RangeKm => record.range_km,
            Metric::OdometerKm => record.odometer_km,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
