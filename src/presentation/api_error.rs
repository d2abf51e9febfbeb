// Mapping of core outcomes onto HTTP responses
use crate::domain::error::{CommandError, IngestError, TelemetryError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    Unprocessable(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    /// Translate a query error, using `not_found` as the detail for NotFound
    pub fn from_query(err: TelemetryError, not_found: &'static str) -> Self {
        match err {
            TelemetryError::NotFound(_) => ApiError::NotFound(not_found),
            TelemetryError::StorageUnavailable(msg) => ApiError::Unavailable(msg),
            other @ TelemetryError::EmptyWindow => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(e) => ApiError::Unprocessable(e.to_string()),
            IngestError::Store(e) => ApiError::from_query(e, "No telemetry found"),
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

/// Body extraction failures (syntax, missing fields, wrong types) share the 422 shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail.to_string()),
            ApiError::Unprocessable(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            ApiError::Unavailable(detail) => {
                tracing::error!("Dependency unavailable: {}", detail);
                (StatusCode::SERVICE_UNAVAILABLE, detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
