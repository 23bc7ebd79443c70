//! Habitability scoring API handlers
//!
//! POST /api/v1/hwo/validate-columns, GET /api/v1/hwo/column-examples,
//! POST /api/v1/hwo/score, POST /api/v1/hwo/score/batch, POST /api/v1/hwo/upload

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use hwo_common::events::HwoEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{body_text, parse_json, run_blocking};
use crate::batch;
use crate::csv_input::parse_csv;
use crate::error::{ApiError, ApiResult};
use crate::mapping::{CanonicalField, FieldKind, FieldTier, MappingReport};
use crate::types::{BatchScoringResponse, RawRow, RawValue, ScoreResult};
use crate::AppState;

/// POST /api/v1/hwo/validate-columns request
#[derive(Debug, Deserialize)]
pub struct ValidateColumnsRequest {
    pub headers: Vec<String>,
    /// A few rows for type sniffing, keyed by header
    #[serde(default)]
    pub sample_data: Vec<Map<String, Value>>,
}

/// POST /api/v1/hwo/score/batch request
#[derive(Debug, Deserialize)]
pub struct BatchScoreRequest {
    pub targets: Vec<Map<String, Value>>,
}

/// One entry of GET /api/v1/hwo/column-examples
#[derive(Debug, Serialize)]
pub struct ColumnExample {
    pub field: CanonicalField,
    pub tier: FieldTier,
    pub kind: FieldKind,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub aliases: &'static [&'static str],
    pub examples: &'static [&'static str],
}

fn raw_row(object: &Map<String, Value>) -> RawRow {
    object
        .iter()
        .map(|(key, value)| (key.clone(), RawValue::from_json(value)))
        .collect()
}

/// Union of the targets' keys, in order of first appearance
fn union_headers(targets: &[Map<String, Value>]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for target in targets {
        for key in target.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

/// POST /api/v1/hwo/validate-columns
///
/// Returns the mapping diagnostics even when `can_proceed` is false.
pub async fn validate_columns(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<MappingReport>> {
    let request: ValidateColumnsRequest = parse_json(&body)?;
    if request.headers.is_empty() {
        return Err(ApiError::BadRequest("headers must not be empty".to_string()));
    }
    let sample: Vec<RawRow> = request.sample_data.iter().map(raw_row).collect();
    let report = state.engine.mapper().map(&request.headers, &sample);
    debug!(
        "Validated {} headers: quality {:.2}, can_proceed {}",
        request.headers.len(),
        report.mapping_quality,
        report.can_proceed
    );
    Ok(Json(report))
}

/// GET /api/v1/hwo/column-examples
pub async fn column_examples() -> Json<Vec<ColumnExample>> {
    Json(
        CanonicalField::ALL
            .iter()
            .map(|field| ColumnExample {
                field: *field,
                tier: field.tier(),
                kind: field.kind(),
                description: field.description(),
                unit: field.unit(),
                aliases: field.aliases(),
                examples: field.examples(),
            })
            .collect(),
    )
}

/// POST /api/v1/hwo/score
///
/// Body is one target object with arbitrary column names.
pub async fn score_target(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<ScoreResult>> {
    let value: Value = parse_json(&body)?;
    let object = value
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("expected a JSON object".to_string()))?;
    let row = raw_row(object);

    let snapshot = state.models.snapshot();
    let (mapping, _) = state.engine.map_single(&row)?;
    let result = state.engine.score_row(&row, &mapping, &snapshot)?;
    Ok(Json(result))
}

async fn score_rows(state: &AppState, headers: Vec<String>, rows: Vec<RawRow>) -> ApiResult<BatchScoringResponse> {
    let engine = state.engine.clone();
    let snapshot = state.models.snapshot();
    let response = run_blocking(move || batch::run(&headers, &rows, &engine, &snapshot)).await??;

    let summary = &response.summary;
    state.event_bus.emit_lossy(HwoEvent::BatchCompleted {
        batch_id: summary.batch_id,
        total: summary.total,
        successful: summary.successful,
        failed: summary.failed,
        degraded_mode: summary.degraded_mode,
        timestamp: Utc::now(),
    });
    Ok(response)
}

/// POST /api/v1/hwo/score/batch
pub async fn score_batch(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<BatchScoringResponse>> {
    let request: BatchScoreRequest = parse_json(&body)?;
    if request.targets.is_empty() {
        return Err(ApiError::BadRequest("targets must not be empty".to_string()));
    }
    let headers = union_headers(&request.targets);
    let rows: Vec<RawRow> = request.targets.iter().map(raw_row).collect();
    info!("Scoring batch of {} targets", rows.len());
    Ok(Json(score_rows(&state, headers, rows).await?))
}

/// POST /api/v1/hwo/upload
///
/// Body is the raw CSV document.
pub async fn upload_csv(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<BatchScoringResponse>> {
    let table = parse_csv(body_text(&body)?)?;
    info!(
        "Scoring uploaded CSV: {} rows, {} columns",
        table.rows.len(),
        table.headers.len()
    );
    Ok(Json(score_rows(&state, table.headers, table.rows).await?))
}

/// Build habitability scoring routes
pub fn hwo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/hwo/validate-columns", post(validate_columns))
        .route("/api/v1/hwo/column-examples", get(column_examples))
        .route("/api/v1/hwo/score", post(score_target))
        .route("/api/v1/hwo/score/batch", post(score_batch))
        .route("/api/v1/hwo/upload", post(upload_csv))
}
