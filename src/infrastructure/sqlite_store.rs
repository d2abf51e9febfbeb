// SQLite telemetry store - Durable first-write-wins storage keyed by (vehicle_id, ts)
use crate::application::telemetry_store::TelemetryStore;
use crate::domain::error::TelemetryError;
use crate::domain::telemetry::{Gps, TelemetryRecord, VehicleStatus, WriteOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SELECT_COLUMNS: &str = "vehicle_id, ts_nanos, speed_kmh, temperature_c, battery_pct, \
     range_km, odometer_km, gps_lat, gps_lon, smoke_detected, status";

#[derive(Debug, Clone)]
pub struct SqliteTelemetryStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteTelemetryStore {
    /// Open or create the database at `path` and make sure the schema exists
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, TelemetryError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        };

        let conn = store.connect()?;
        // WAL lets readers proceed while a writer holds the lock
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS telemetry (
                vehicle_id TEXT NOT NULL,
                ts_nanos INTEGER NOT NULL,
                speed_kmh REAL NOT NULL,
                temperature_c REAL NOT NULL,
                battery_pct INTEGER NOT NULL,
                range_km REAL NOT NULL,
                odometer_km REAL NOT NULL,
                gps_lat REAL NOT NULL,
                gps_lon REAL NOT NULL,
                smoke_detected INTEGER NOT NULL,
                status TEXT NOT NULL,
                PRIMARY KEY (vehicle_id, ts_nanos)
            );
            "#,
        )?;

        tracing::info!("Opened telemetry store at {}", store.path.display());
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, TelemetryError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Run a closure against a fresh connection on the blocking pool
    async fn with_connection<T, F>(&self, op: F) -> Result<T, TelemetryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, TelemetryError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.connect()?;
            op(&conn)
        })
        .await?
    }
}

impl From<rusqlite::Error> for TelemetryError {
    fn from(err: rusqlite::Error) -> Self {
        TelemetryError::StorageUnavailable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for TelemetryError {
    fn from(err: tokio::task::JoinError) -> Self {
        TelemetryError::StorageUnavailable(format!("storage task failed: {}", err))
    }
}

fn timestamp_key(timestamp: &DateTime<Utc>) -> Result<i64, TelemetryError> {
    timestamp.timestamp_nanos_opt().ok_or_else(|| {
        TelemetryError::StorageUnavailable(format!("timestamp {} cannot be keyed", timestamp))
    })
}

/// Lower bound for a range scan. Instants past either end of the i64 nanosecond
/// range clamp to that end.
fn window_start_key(window_start: &DateTime<Utc>) -> i64 {
    window_start.timestamp_nanos_opt().unwrap_or(if window_start.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TelemetryRecord> {
    let status: String = row.get(10)?;
    let status = VehicleStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(10, "status".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(TelemetryRecord {
        vehicle_id: row.get(0)?,
        timestamp: DateTime::from_timestamp_nanos(row.get(1)?),
        speed_kmh: row.get(2)?,
        temperature_c: row.get(3)?,
        battery_pct: row.get(4)?,
        range_km: row.get(5)?,
        odometer_km: row.get(6)?,
        gps: Gps {
            lat: row.get(7)?,
            lon: row.get(8)?,
        },
        smoke_detected: row.get(9)?,
        status,
    })
}

#[async_trait]
impl TelemetryStore for SqliteTelemetryStore {
    async fn write(&self, record: &TelemetryRecord) -> Result<WriteOutcome, TelemetryError> {
        let ts_nanos = timestamp_key(&record.timestamp)?;
        let record = record.clone();

        self.with_connection(move |conn| {
            let changed = conn.execute(
                "INSERT INTO telemetry (
                    vehicle_id, ts_nanos, speed_kmh, temperature_c, battery_pct,
                    range_km, odometer_km, gps_lat, gps_lon, smoke_detected, status
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(vehicle_id, ts_nanos) DO NOTHING",
                params![
                    &record.vehicle_id,
                    ts_nanos,
                    record.speed_kmh,
                    record.temperature_c,
                    record.battery_pct,
                    record.range_km,
                    record.odometer_km,
                    record.gps.lat,
                    record.gps.lon,
                    record.smoke_detected,
                    record.status.as_str(),
                ],
            )?;

            Ok(if changed == 0 {
                WriteOutcome::Skipped
            } else {
                WriteOutcome::Inserted
            })
        })
        .await
    }

    async fn latest(&self, vehicle_id: &str) -> Result<Option<TelemetryRecord>, TelemetryError> {
        let vehicle_id = vehicle_id.to_string();

        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {} FROM telemetry WHERE vehicle_id = ?1 ORDER BY ts_nanos DESC LIMIT 1",
                SELECT_COLUMNS
            );
            let record = conn
                .query_row(&sql, params![vehicle_id], row_to_record)
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn range_query(
        &self,
        vehicle_id: &str,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<TelemetryRecord>, TelemetryError> {
        let vehicle_id = vehicle_id.to_string();
        let start_nanos = window_start_key(&window_start);

        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {} FROM telemetry WHERE vehicle_id = ?1 AND ts_nanos >= ?2 ORDER BY ts_nanos ASC",
                SELECT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![vehicle_id, start_nanos], row_to_record)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            tracing::debug!("Range query for {} returned {} records", vehicle_id, records.len());
            Ok(records)
        })
        .await
    }
}
