//! hwo-score library interface
//!
//! Exoplanet habitability and observability scoring: column mapping,
//! normalisation, CDHS and ML scoring, batch orchestration and the HTTP API.
//! Exposed as a library so integration tests can drive the router directly.

pub mod api;
pub mod batch;
pub mod cdhs;
pub mod csv_input;
pub mod error;
pub mod features;
pub mod mapping;
pub mod ml;
pub mod normalize;
pub mod observability;
pub mod scoring;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use hwo_common::config::TomlConfig;
use hwo_common::events::EventBus;
use hwo_common::InstrumentParams;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::ml::ModelStore;
use crate::observability::ReferenceCatalog;
use crate::scoring::ScoringEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Current ML model snapshot; handlers clone the Arc once per request
    pub models: Arc<ModelStore>,
    pub engine: Arc<ScoringEngine>,
    /// Reference targets for observability counts
    pub catalog: Arc<ReferenceCatalog>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Latest published instrument parameters
    pub params_tx: Arc<watch::Sender<InstrumentParams>>,
    pub config: Arc<TomlConfig>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: TomlConfig, models: ModelStore, catalog: ReferenceCatalog, event_bus: EventBus) -> Self {
        let (params_tx, _) = watch::channel(config.observability);
        Self {
            models: Arc::new(models),
            engine: Arc::new(ScoringEngine::from_config(&config.scoring)),
            catalog: Arc::new(catalog),
            event_bus,
            params_tx: Arc::new(params_tx),
            config: Arc::new(config),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Instrument parameters currently in effect
    pub fn current_params(&self) -> InstrumentParams {
        *self.params_tx.borrow()
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let max_upload_bytes = state.config.max_upload_bytes;
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .merge(api::hwo_routes())
        .merge(api::model_routes())
        .merge(api::observability_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
