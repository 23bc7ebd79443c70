//! Error types for hwo-score
//!
//! Status mapping: malformed input 400, validation failure 422 (column
//! mapping cannot proceed, rejected target, out-of-range instrument
//! parameter), model load failure and internal errors 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hwo_common::instrument::InstrumentParamError;
use hwo_common::WavelengthBand;
use serde_json::{json, Value};
use thiserror::Error;

use crate::csv_input::CsvInputError;
use crate::mapping::MappingError;
use crate::ml::ModelUnavailableError;
use crate::normalize::RowError;
use crate::observability::ObservabilityError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Required columns could not be mapped (422)
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Single target failed normalisation (422)
    #[error("Target rejected: {0}")]
    RowRejected(#[from] RowError),

    /// Target values unusable for observability scoring (422)
    #[error("{0}")]
    InvalidTarget(String),

    /// Instrument parameter out of range (422)
    #[error(transparent)]
    InstrumentParam(#[from] InstrumentParamError),

    /// Model artifacts could not be loaded (500)
    #[error("Model load failed: {0}")]
    ModelLoad(#[from] ModelUnavailableError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CsvInputError> for ApiError {
    fn from(err: CsvInputError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ObservabilityError> for ApiError {
    fn from(err: ObservabilityError) -> Self {
        match err {
            ObservabilityError::InstrumentParam(e) => ApiError::InstrumentParam(e),
            other @ ObservabilityError::InvalidTarget { .. } => ApiError::InvalidTarget(other.to_string()),
        }
    }
}

fn instrument_details(err: &InstrumentParamError) -> Value {
    match err {
        InstrumentParamError::OutOfRange {
            parameter,
            value,
            min,
            max,
        } => json!({
            "parameter": parameter,
            "value": value,
            "valid_range": {"min": min, "max": max},
        }),
        InstrumentParamError::UnknownBand(band) => json!({
            "parameter": "wavelength_band",
            "value": band,
            "allowed": WavelengthBand::ALL.iter().map(|b| b.as_str()).collect::<Vec<_>>(),
        }),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, error_code, details) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", None),
            ApiError::Mapping(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MAPPING_FAILED",
                Some(json!({
                    "missing_required": err.missing_required,
                    "suggestions": err.suggestions,
                })),
            ),
            ApiError::RowRejected(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ROW_REJECTED",
                Some(json!({"field": err.field, "reason": err.reason})),
            ),
            ApiError::InvalidTarget(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TARGET", None),
            ApiError::InstrumentParam(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSTRUMENT_PARAM_OUT_OF_RANGE",
                Some(instrument_details(err)),
            ),
            ApiError::ModelLoad(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MODEL_LOAD_FAILED", None),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
