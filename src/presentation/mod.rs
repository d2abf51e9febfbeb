// Presentation layer - HTTP routes over the application services
pub mod api_error;
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, ingest, latest_telemetry, send_command, telemetry_anomalies, telemetry_stats,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/ingest", post(ingest))
        .route("/vehicles/:id/latest", get(latest_telemetry))
        .route("/vehicles/:id/stats", get(telemetry_stats))
        .route("/vehicles/:id/anomalies", get(telemetry_anomalies))
        .route("/vehicles/:id/commands", post(send_command))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
