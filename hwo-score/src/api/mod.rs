//! HTTP API handlers for hwo-score
//!
//! REST endpoints under `/api/v1` plus SSE at `/events` and
//! `/api/v1/observability/params/stream`.

pub mod health;
pub mod hwo;
pub mod models;
pub mod observability;
pub mod sse;

pub use health::health_routes;
pub use hwo::hwo_routes;
pub use models::model_routes;
pub use observability::observability_routes;
pub use sse::event_stream;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Decode a JSON request body
///
/// Syntax and shape errors both map to 400.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("malformed JSON body: {}", e)))
}

/// Borrow a text request body (CSV uploads)
pub(crate) fn body_text(body: &Bytes) -> ApiResult<&str> {
    std::str::from_utf8(body).map_err(|e| ApiError::BadRequest(format!("request body is not UTF-8: {}", e)))
}

/// Run CPU-bound work off the async runtime
pub(crate) async fn run_blocking<F, T>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))
}
