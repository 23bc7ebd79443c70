//! Model management API handlers
//!
//! GET /api/v1/hwo/models/info, POST /api/v1/hwo/models/reload

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use hwo_common::events::HwoEvent;
use tracing::{error, info};

use super::run_blocking;
use crate::error::ApiResult;
use crate::ml::store::ModelInfo;
use crate::AppState;

/// GET /api/v1/hwo/models/info
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.models.snapshot().info())
}

/// POST /api/v1/hwo/models/reload
///
/// Loads the models directory into a new snapshot and swaps it in. Requests
/// already running keep the snapshot they started with. On failure the
/// previous snapshot stays active.
pub async fn reload_models(State(state): State<AppState>) -> ApiResult<Json<ModelInfo>> {
    info!("Reloading ML models from {}", state.models.models_dir().display());
    let models = state.models.clone();

    match run_blocking(move || models.reload()).await? {
        Ok(snapshot) => {
            state.event_bus.emit_lossy(HwoEvent::ModelsReloaded {
                version: snapshot.version().map(str::to_string),
                degraded: snapshot.is_degraded(),
                timestamp: Utc::now(),
            });
            Ok(Json(snapshot.info()))
        }
        Err(e) => {
            error!("Model reload failed: {}", e);
            state.record_error(format!("Model reload failed: {}", e)).await;
            Err(e.into())
        }
    }
}

/// Build model management routes
pub fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/hwo/models/info", get(model_info))
        .route("/api/v1/hwo/models/reload", post(reload_models))
}
