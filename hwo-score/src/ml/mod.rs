//! ML Predictor
//!
//! Pre-trained models are opaque `predict(features) -> (value, confidence)`
//! functions behind [`HabitabilityModel`]. The loaded set lives in an
//! immutable [`ModelMetadata`] snapshot; [`ModelStore`] swaps snapshots
//! wholesale on reload.

pub mod ensemble;
pub mod predictor;
pub mod store;

pub use predictor::{predict, MlPrediction, PredictionMode};
pub use store::{ModelMetadata, ModelStore, Scaler, METADATA_FILE};

use std::path::PathBuf;
use thiserror::Error;

/// Raw output of one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOutput {
    /// Score or probability in [0, 1]
    pub value: f64,
    /// Model-internal calibration in [0, 1]
    pub confidence: f64,
}

/// A pre-trained model
pub trait HabitabilityModel: Send + Sync {
    /// Features arrive in the order named by the model metadata
    fn predict(&self, features: &[f64]) -> ModelOutput;
}

/// Model artifacts missing or corrupt
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelUnavailableError {
    #[error("model artifact not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {}", .path.display(), .message)]
    Io { path: PathBuf, message: String },

    #[error("invalid model artifact: {0}")]
    Invalid(String),
}
