// HTTP request handlers
use crate::domain::command::CommandMessage;
use crate::domain::telemetry::{TelemetryRecord, WriteOutcome};
use crate::domain::validation::TelemetryPayload;
use crate::domain::window::{AnomalyReport, WindowStats};
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

const NO_TELEMETRY: &str = "No telemetry found";
const NO_TELEMETRY_IN_WINDOW: &str = "No telemetry in window";

#[derive(Deserialize)]
pub struct WindowQuery {
    pub minutes: Option<i64>,
    pub threshold: Option<f64>,
}

impl WindowQuery {
    fn minutes(&self, default: u32) -> Result<u32, ApiError> {
        match self.minutes {
            None => Ok(default),
            Some(m) if m > 0 => u32::try_from(m)
                .map_err(|_| ApiError::Unprocessable(format!("minutes {} is too large", m))),
            Some(m) => Err(ApiError::Unprocessable(format!(
                "minutes must be positive, got {}",
                m
            ))),
        }
    }

    fn threshold(&self) -> Result<Option<f64>, ApiError> {
        match self.threshold {
            Some(t) if !(t.is_finite() && t > 0.0) => Err(ApiError::Unprocessable(format!(
                "threshold must be a positive number, got {}",
                t
            ))),
            other => Ok(other),
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Ingest one telemetry sample
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TelemetryPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let Json(payload) = payload?;
    match state.ingest_service.ingest(payload).await? {
        WriteOutcome::Inserted => Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "saved": true })),
        )),
        WriteOutcome::Skipped => Ok((
            StatusCode::OK,
            Json(serde_json::json!({ "saved": false, "duplicate": true })),
        )),
    }
}

/// Most recent sample for a vehicle
pub async fn latest_telemetry(
    Path(vehicle_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TelemetryRecord>, ApiError> {
    state
        .query_service
        .latest(&vehicle_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_query(e, NO_TELEMETRY))
}

/// Summary statistics over a trailing window
pub async fn telemetry_stats(
    Path(vehicle_id): Path<String>,
    Query(query): Query<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<WindowStats>, ApiError> {
    let minutes = query.minutes(state.query_service.settings().default_window_minutes)?;

    state
        .query_service
        .stats(&vehicle_id, minutes)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_query(e, NO_TELEMETRY_IN_WINDOW))
}

/// Robust z-score anomalies over a trailing window
pub async fn telemetry_anomalies(
    Path(vehicle_id): Path<String>,
    Query(query): Query<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnomalyReport>, ApiError> {
    let minutes = query.minutes(state.query_service.settings().default_window_minutes)?;
    let threshold = query.threshold()?;

    state
        .query_service
        .anomalies(&vehicle_id, minutes, threshold)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_query(e, NO_TELEMETRY_IN_WINDOW))
}

/// Publish a remote command to one vehicle
pub async fn send_command(
    Path(vehicle_id): Path<String>,
    State(state): State<Arc<AppState>>,
    request: Result<Json<CommandMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let Json(request) = request?;
    state
        .command_service
        .send(&vehicle_id, request.command)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "published": true })),
    ))
}
