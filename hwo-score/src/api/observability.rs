//! Observability API handlers
//!
//! Single-target scoring, catalogue counts, CSV scoring/export and the live
//! parameter channel. Every endpoint is a pure recomputation from the
//! parameters it is given (or the latest published set); nothing is cached.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream::Stream;
use hwo_common::events::HwoEvent;
use hwo_common::instrument::validate_threshold;
use hwo_common::sse::HEARTBEAT_INTERVAL;
use hwo_common::{InstrumentParams, WavelengthBand};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{body_text, parse_json};
use crate::csv_input::parse_csv;
use crate::error::{ApiError, ApiResult};
use crate::observability::{
    self, map_observability_columns, targets_from_rows, ObservabilityResult, ObservabilityTarget,
    ReferenceCatalog, DEFAULT_THRESHOLD,
};
use crate::types::BatchRowError;
use crate::AppState;

/// Partial instrument parameter set; absent fields keep the base value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstrumentParamsInput {
    #[serde(alias = "telescope_diameter_m")]
    pub diameter_m: Option<f64>,
    pub wavelength_band: Option<String>,
    #[serde(alias = "inner_working_angle_mas")]
    pub iwa_mas: Option<f64>,
    pub contrast_sensitivity: Option<f64>,
}

impl InstrumentParamsInput {
    /// Overlay onto `base` and validate the result
    pub fn resolve(&self, base: InstrumentParams) -> ApiResult<InstrumentParams> {
        let mut params = base;
        if let Some(diameter_m) = self.diameter_m {
            params.diameter_m = diameter_m;
        }
        if let Some(band) = &self.wavelength_band {
            params.wavelength_band = band.parse::<WavelengthBand>()?;
        }
        if let Some(iwa_mas) = self.iwa_mas {
            params.iwa_mas = iwa_mas;
        }
        if let Some(contrast_sensitivity) = self.contrast_sensitivity {
            params.contrast_sensitivity = contrast_sensitivity;
        }
        Ok(params.validated()?)
    }
}

/// Query string for count and CSV endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamsQuery {
    #[serde(alias = "telescope_diameter_m")]
    pub diameter_m: Option<f64>,
    pub wavelength_band: Option<String>,
    #[serde(alias = "inner_working_angle_mas")]
    pub iwa_mas: Option<f64>,
    pub contrast_sensitivity: Option<f64>,
    pub threshold: Option<f64>,
}

impl ParamsQuery {
    fn instrument(&self) -> InstrumentParamsInput {
        InstrumentParamsInput {
            diameter_m: self.diameter_m,
            wavelength_band: self.wavelength_band.clone(),
            iwa_mas: self.iwa_mas,
            contrast_sensitivity: self.contrast_sensitivity,
        }
    }

    fn threshold(&self) -> ApiResult<f64> {
        Ok(validate_threshold(self.threshold.unwrap_or(DEFAULT_THRESHOLD))?)
    }
}

/// POST /api/v1/observability/score request
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub target: ObservabilityTarget,
    #[serde(default, alias = "instrument_params")]
    pub instrument: InstrumentParamsInput,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    #[serde(flatten)]
    pub result: ObservabilityResult,
    pub params: InstrumentParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: usize,
    pub threshold: f64,
    pub catalog_size: usize,
    pub params: InstrumentParams,
}

#[derive(Debug, Serialize)]
pub struct CsvScoreResponse {
    pub results: Vec<ObservabilityResult>,
    pub errors: Vec<BatchRowError>,
    pub params: InstrumentParams,
}

fn count_catalog(catalog: &ReferenceCatalog, params: InstrumentParams, threshold: f64) -> ApiResult<CountResponse> {
    let count = observability::count(catalog.targets(), &params, threshold)?;
    Ok(CountResponse {
        count,
        threshold,
        catalog_size: catalog.len(),
        params,
    })
}

/// POST /api/v1/observability/score
///
/// Instrument fields absent from the request take the latest published values.
pub async fn score_target(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ScoreResponse>> {
    let request: ScoreRequest = parse_json(&body)?;
    let params = request.instrument.resolve(state.current_params())?;
    let result = observability::score(&request.target, &params)?;
    Ok(Json(ScoreResponse { result, params }))
}

/// GET /api/v1/observability/count
pub async fn count_observable(
    State(state): State<AppState>,
    Query(query): Query<ParamsQuery>,
) -> ApiResult<Json<CountResponse>> {
    let params = query.instrument().resolve(state.current_params())?;
    let threshold = query.threshold()?;
    let response = count_catalog(&state.catalog, params, threshold)?;
    debug!(
        "Observable count {} of {} (iwa {} mas, D {} m)",
        response.count, response.catalog_size, params.iwa_mas, params.diameter_m
    );
    Ok(Json(response))
}

/// POST /api/v1/observability/publish-params
///
/// Overlays the patch onto the latest parameter set and notifies stream
/// subscribers. The overlay runs under the channel's write lock, so concurrent
/// partial publishes compose instead of overwriting each other.
pub async fn publish_params(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<CountResponse>> {
    let input: InstrumentParamsInput = parse_json(&body)?;
    let mut resolved: ApiResult<InstrumentParams> =
        Err(ApiError::Internal("parameter update not applied".to_string()));
    state.params_tx.send_if_modified(|current| {
        resolved = input.resolve(*current);
        match &resolved {
            Ok(params) => {
                *current = *params;
                true
            }
            Err(_) => false,
        }
    });
    let params = resolved?;
    let response = count_catalog(&state.catalog, params, DEFAULT_THRESHOLD)?;

    state.event_bus.emit_lossy(HwoEvent::ParamsPublished {
        params,
        observable_count: response.count,
        catalog_size: response.catalog_size,
        timestamp: Utc::now(),
    });
    info!(
        "Published instrument params: D {} m, {}, iwa {} mas -> {} observable",
        params.diameter_m, params.wavelength_band, params.iwa_mas, response.count
    );
    Ok(Json(response))
}

/// GET /api/v1/observability/params/stream
///
/// Sends the current parameter set with its count on connect, then again after
/// every publish. Intermediate values published faster than the client reads
/// are skipped; the latest one is always delivered.
pub async fn params_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to params stream");
    let mut rx = state.params_tx.subscribe();
    let catalog: Arc<ReferenceCatalog> = state.catalog.clone();

    let stream = async_stream::stream! {
        loop {
            let params = *rx.borrow_and_update();
            match count_catalog(&catalog, params, DEFAULT_THRESHOLD) {
                Ok(response) => match serde_json::to_string(&response) {
                    Ok(json) => {
                        yield Ok(Event::default().event("params").data(json));
                    }
                    Err(e) => {
                        warn!("SSE: Failed to serialize params update: {}", e);
                    }
                },
                Err(e) => {
                    warn!("SSE: Params update not countable: {}", e);
                }
            }
            if rx.changed().await.is_err() {
                debug!("SSE: params channel closed");
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}

fn score_csv_body(state: &AppState, body: &str, query: &ParamsQuery) -> ApiResult<CsvScoreResponse> {
    let params = query.instrument().resolve(state.current_params())?;
    let table = parse_csv(body)?;
    let mapping = map_observability_columns(state.engine.mapper(), &table.headers, &table.rows)?;
    let (targets, errors) = targets_from_rows(&mapping, &table.rows);
    let results = targets
        .iter()
        .map(|target| observability::score(target, &params))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Scored {} CSV targets, {} rejected", results.len(), errors.len());
    Ok(CsvScoreResponse {
        results,
        errors,
        params,
    })
}

/// POST /api/v1/observability/score-csv
pub async fn score_csv(
    State(state): State<AppState>,
    Query(query): Query<ParamsQuery>,
    body: Bytes,
) -> ApiResult<Json<CsvScoreResponse>> {
    Ok(Json(score_csv_body(&state, body_text(&body)?, &query)?))
}

/// POST /api/v1/observability/export-csv
///
/// Same scoring as `score-csv`, returned as `text/csv`.
pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ParamsQuery>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let scored = score_csv_body(&state, body_text(&body)?, &query)?;
    let csv = observability::export_csv(&scored.results)
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"observability.csv\""),
        ],
        csv,
    ))
}

/// Build observability routes
pub fn observability_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/observability/score", post(score_target))
        .route("/api/v1/observability/count", get(count_observable))
        .route("/api/v1/observability/publish-params", post(publish_params))
        .route("/api/v1/observability/params/stream", get(params_stream))
        .route("/api/v1/observability/score-csv", post(score_csv))
        .route("/api/v1/observability/export-csv", post(export_csv))
}
