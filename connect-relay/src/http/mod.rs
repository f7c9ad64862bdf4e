//! HTTP endpoints for connect-relay.
//!
//! Exposes the device API (init, push, poll, participants, bridge), file
//! downloads, health checks and metrics.

mod api;
mod health;
mod metrics;

use crate::error::RelayError;
use crate::server::ConnectRelay;
use crate::storage::BlobStore;
use axum::extract::multipart::MultipartError;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use connect_types::api::ErrorResponse;
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<ConnectRelay>, blobs: Arc<dyn BlobStore>) -> Router {
    let body_limit = relay.config().storage.body_limit();

    let mut router = Router::new()
        .route("/api/init/:node_id", get(api::init_handler))
        .route("/api/push", post(api::push_handler))
        .route("/api/poll/:node_id", get(api::poll_handler))
        .route("/api/participants/:node_id", get(api::participants_handler))
        .route("/api/bridge", post(api::bridge_handler))
        .route("/download/:reference", get(api::download_handler))
        .route("/health", get(health::health_handler));

    if relay.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(relay))
        .layer(Extension(blobs))
}

/// Error returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Error from the relay core or blob store.
    Relay(RelayError),
    /// Malformed or oversized multipart upload.
    Multipart(MultipartError),
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        ApiError::Relay(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Relay(RelayError::DeviceNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "Node not found".to_string())
            }
            ApiError::Relay(err @ RelayError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Relay(err) if err.is_not_found() => (StatusCode::NOT_FOUND, err.to_string()),
            ApiError::Relay(err) => {
                tracing::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Multipart(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "File too large for the configured upload limit".to_string(),
            ),
            ApiError::Multipart(err) => (err.status(), err.body_text()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
