// Telemetry payload validation - Wire shape to trusted record
use super::error::ValidationError;
use super::telemetry::{Gps, TelemetryRecord, VehicleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsPayload {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub vehicle_id: String,
    pub ts: String,
    pub speed_kmh: f64,
    pub temperature_c: f64,
    /// Whole percent; integral floats such as `55.0` are accepted
    pub battery_pct: f64,
    pub range_km: f64,
    pub odometer_km: f64,
    pub gps: GpsPayload,
    pub smoke_detected: bool,
    pub status: String,
}

impl TelemetryPayload {
    pub fn validate(self) -> Result<TelemetryRecord, ValidationError> {
        if self.vehicle_id.trim().is_empty() {
            return Err(ValidationError::EmptyVehicleId);
        }

        let timestamp = parse_timestamp(&self.ts)?;

        for (field, value) in [
            ("speed_kmh", self.speed_kmh),
            ("temperature_c", self.temperature_c),
            ("range_km", self.range_km),
            ("odometer_km", self.odometer_km),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { field });
            }
        }

        let battery_pct = battery_percent(self.battery_pct)?;

        // NaN fails both range checks as well
        if !(-90.0..=90.0).contains(&self.gps.lat) {
            return Err(ValidationError::LatitudeOutOfRange(self.gps.lat));
        }
        if !(-180.0..=180.0).contains(&self.gps.lon) {
            return Err(ValidationError::LongitudeOutOfRange(self.gps.lon));
        }

        let status = VehicleStatus::parse(&self.status)
            .ok_or_else(|| ValidationError::InvalidStatus(self.status.clone()))?;

        Ok(TelemetryRecord {
            vehicle_id: self.vehicle_id,
            timestamp,
            speed_kmh: self.speed_kmh,
            temperature_c: self.temperature_c,
            battery_pct,
            range_km: self.range_km,
            odometer_km: self.odometer_km,
            gps: Gps {
                lat: self.gps.lat,
                lon: self.gps.lon,
            },
            smoke_detected: self.smoke_detected,
            status,
        })
    }
}

impl From<&TelemetryRecord> for TelemetryPayload {
    fn from(record: &TelemetryRecord) -> Self {
        Self {
            vehicle_id: record.vehicle_id.clone(),
            ts: record
                .timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            speed_kmh: record.speed_kmh,
            temperature_c: record.temperature_c,
            battery_pct: f64::from(record.battery_pct),
            range_km: record.range_km,
            odometer_km: record.odometer_km,
            gps: GpsPayload {
                lat: record.gps.lat,
                lon: record.gps.lon,
            },
            smoke_detected: record.smoke_detected,
            status: record.status.as_str().to_string(),
        }
    }
}

fn battery_percent(value: f64) -> Result<u8, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            field: "battery_pct",
        });
    }
    if value.fract() != 0.0 {
        return Err(ValidationError::BatteryNotWhole(value));
    }
    if !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::BatteryOutOfRange(value));
    }
    Ok(value as u8)
}

/// Parse an RFC 3339 timestamp and normalise it to UTC.
///
/// Rejects instants the store cannot key on (outside the i64 nanosecond range).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|_| ValidationError::InvalidTimestamp(raw.to_string()))?
        .with_timezone(&Utc);

    if parsed.timestamp_nanos_opt().is_none() {
        return Err(ValidationError::InvalidTimestamp(raw.to_string()));
    }
    Ok(parsed)
}
