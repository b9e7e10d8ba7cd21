//! HTTP interface for page conversion.
//!
//! `POST /api/convert` takes `{ url, options? }` and answers with
//! `{ markdown, metadata }` or `{ error }`. `GET /api/health` (also
//! `GET /api/convert`) reports liveness.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pagedown_core::{ConversionOptions, ConversionResult, Converter, ErrorKind, FailureKind, PagedownError};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Headroom on top of the fetch timeout before the whole request is cut off.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

const INVALID_REQUEST: &str = "Invalid request data";

#[derive(Clone)]
struct AppState {
    converter: Arc<Converter>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub url: String,
    #[serde(default)]
    pub options: ConversionOptions,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

/// An error response: status plus a user-facing message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<PagedownError> for ApiError {
    fn from(err: PagedownError) -> Self {
        let status = status_for(&err);
        if err.kind() == ErrorKind::Internal {
            tracing::error!(error = %err, %status, "conversion failed");
        } else {
            tracing::warn!(error = %err, %status, "conversion failed");
        }
        Self { status, message: err.user_message().to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(err: &PagedownError) -> StatusCode {
    match err.failure_kind() {
        FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FailureKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        FailureKind::HttpStatus(_) | FailureKind::Network => StatusCode::BAD_GATEWAY,
        other => match other.error_kind() {
            ErrorKind::Input => StatusCode::BAD_REQUEST,
            ErrorKind::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

/// Builds the application router around a shared converter.
pub fn router(converter: Converter) -> Router {
    let request_timeout = Duration::from_millis(converter.config().fetch.timeout_ms) + REQUEST_TIMEOUT_SLACK;
    let state = AppState { converter: Arc::new(converter) };

    Router::new()
        .route("/api/convert", get(health).post(convert))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, request_timeout))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn convert(
    State(state): State<AppState>, payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConversionResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected request body");
        ApiError::bad_request(INVALID_REQUEST)
    })?;

    pagedown_core::validate_url(&request.url)?;

    tracing::info!(url = %request.url.trim(), "converting");
    let result = state.converter.convert_url(request.url.trim(), &request.options).await?;

    Ok(Json(result))
}
