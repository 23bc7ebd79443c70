//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::ml::PredictionMode;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" while scoring runs without ML models
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_mode: PredictionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub catalog_size: usize,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let snapshot = state.models.snapshot();
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if snapshot.is_degraded() { "degraded" } else { "ok" }.to_string(),
        module: "hwo-score".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        model_mode: snapshot.mode(),
        model_version: snapshot.version().map(str::to_string),
        catalog_size: state.catalog.len(),
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
