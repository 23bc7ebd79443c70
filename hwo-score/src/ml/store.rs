//! Model snapshot loading and atomic reload
//!
//! `model_metadata.json` in the models directory names the artifacts:
//!
//! ```json
//! {
//!   "version": "2024.06",
//!   "feature_names": ["distance_pc", "planet_radius_earth", "..."],
//!   "regressor": "regressor.json",
//!   "classifier": "classifier.json",
//!   "scaler": {"mean": [...], "scale": [...]}
//! }
//! ```
//!
//! A snapshot is built completely before it is published, so readers see
//! either the old or the new model set, never a mix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use super::ensemble::{TreeClassifier, TreeEnsemble, TreeRegressor};
use super::{HabitabilityModel, ModelUnavailableError, PredictionMode};
use crate::features::{feature_index, FeatureVector, FEATURE_NAMES};

/// Metadata file name inside the models directory
pub const METADATA_FILE: &str = "model_metadata.json";

#[derive(Debug, Deserialize)]
struct MetadataFile {
    version: String,
    feature_names: Vec<String>,
    #[serde(default)]
    regressor: Option<String>,
    #[serde(default)]
    classifier: Option<String>,
    #[serde(default)]
    scaler: Option<Scaler>,
}

/// Standard scaler applied to model inputs: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    fn validate(&self, n_features: usize) -> Result<(), ModelUnavailableError> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(ModelUnavailableError::Invalid(format!(
                "scaler has {}/{} entries for {} features",
                self.mean.len(),
                self.scale.len(),
                n_features
            )));
        }
        if self.mean.iter().chain(self.scale.iter()).any(|v| !v.is_finite()) {
            return Err(ModelUnavailableError::Invalid("scaler values must be finite".to_string()));
        }
        Ok(())
    }

    fn apply(&self, values: &mut [f64]) {
        for ((value, mean), scale) in values.iter_mut().zip(&self.mean).zip(&self.scale) {
            let scale = if *scale == 0.0 { 1.0 } else { *scale };
            *value = (*value - mean) / scale;
        }
    }
}

/// Loaded model set (immutable)
pub struct ModelMetadata {
    version: Option<String>,
    feature_names: Vec<String>,
    feature_indices: Vec<usize>,
    scaler: Option<Scaler>,
    regressor: Option<Arc<dyn HabitabilityModel>>,
    classifier: Option<Arc<dyn HabitabilityModel>>,
    source_dir: Option<PathBuf>,
    loaded_at: DateTime<Utc>,
    fallback_reason: Option<String>,
}

impl fmt::Debug for ModelMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMetadata")
            .field("version", &self.version)
            .field("feature_names", &self.feature_names)
            .field("has_regressor", &self.regressor.is_some())
            .field("has_classifier", &self.classifier.is_some())
            .field("scaled", &self.scaler.is_some())
            .field("fallback_reason", &self.fallback_reason)
            .finish()
    }
}

/// `models/info` response body
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub mode: PredictionMode,
    pub version: Option<String>,
    pub feature_names: Vec<String>,
    pub has_regressor: bool,
    pub has_classifier: bool,
    pub scaled: bool,
    pub source_dir: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
    pub fallback_reason: Option<String>,
}

fn read_artifact(path: &Path) -> Result<String, ModelUnavailableError> {
    if !path.exists() {
        return Err(ModelUnavailableError::Missing(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|e| ModelUnavailableError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl ModelMetadata {
    /// Snapshot with no models; predictions fall back to CDHS
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            version: None,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            feature_indices: (0..FEATURE_NAMES.len()).collect(),
            scaler: None,
            regressor: None,
            classifier: None,
            source_dir: None,
            loaded_at: Utc::now(),
            fallback_reason: Some(reason.into()),
        }
    }

    /// Load and validate every artifact listed in `dir/model_metadata.json`
    pub fn load_dir(dir: &Path) -> Result<Self, ModelUnavailableError> {
        let metadata_path = dir.join(METADATA_FILE);
        let file: MetadataFile = serde_json::from_str(&read_artifact(&metadata_path)?)
            .map_err(|e| ModelUnavailableError::Invalid(format!("{}: {}", METADATA_FILE, e)))?;

        if file.feature_names.is_empty() {
            return Err(ModelUnavailableError::Invalid("feature_names is empty".to_string()));
        }
        let feature_indices = file
            .feature_names
            .iter()
            .map(|name| {
                feature_index(name)
                    .ok_or_else(|| ModelUnavailableError::Invalid(format!("unknown feature '{}'", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let n_features = feature_indices.len();

        if let Some(scaler) = &file.scaler {
            scaler.validate(n_features)?;
        }

        let load_ensemble = |name: &str| -> Result<TreeEnsemble, ModelUnavailableError> {
            TreeEnsemble::from_json(&read_artifact(&dir.join(name))?, n_features)
        };
        let regressor: Option<Arc<dyn HabitabilityModel>> = match &file.regressor {
            Some(name) => Some(Arc::new(TreeRegressor::new(load_ensemble(name)?))),
            None => None,
        };
        let classifier: Option<Arc<dyn HabitabilityModel>> = match &file.classifier {
            Some(name) => Some(Arc::new(TreeClassifier::new(load_ensemble(name)?))),
            None => None,
        };
        if regressor.is_none() && classifier.is_none() {
            return Err(ModelUnavailableError::Invalid(
                "metadata lists neither a regressor nor a classifier".to_string(),
            ));
        }

        Ok(Self {
            version: Some(file.version),
            feature_names: file.feature_names,
            feature_indices,
            scaler: file.scaler,
            regressor,
            classifier,
            source_dir: Some(dir.to_path_buf()),
            loaded_at: Utc::now(),
            fallback_reason: None,
        })
    }

    /// True when no model is loaded
    pub fn is_degraded(&self) -> bool {
        self.regressor.is_none() && self.classifier.is_none()
    }

    pub fn mode(&self) -> PredictionMode {
        if self.is_degraded() {
            PredictionMode::CdhsFallback
        } else {
            PredictionMode::Ensemble
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn regressor(&self) -> Option<&dyn HabitabilityModel> {
        self.regressor.as_deref()
    }

    pub fn classifier(&self) -> Option<&dyn HabitabilityModel> {
        self.classifier.as_deref()
    }

    /// Model input row: features in metadata order, non-finite values
    /// zeroed, then scaled
    pub fn model_inputs(&self, features: &FeatureVector) -> Vec<f64> {
        let mut inputs: Vec<f64> = features
            .ordered(&self.feature_indices)
            .into_iter()
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect();
        if let Some(scaler) = &self.scaler {
            scaler.apply(&mut inputs);
        }
        inputs
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            mode: self.mode(),
            version: self.version.clone(),
            feature_names: self.feature_names.clone(),
            has_regressor: self.regressor.is_some(),
            has_classifier: self.classifier.is_some(),
            scaled: self.scaler.is_some(),
            source_dir: self.source_dir.clone(),
            loaded_at: self.loaded_at,
            fallback_reason: self.fallback_reason.clone(),
        }
    }
}

/// Process-wide holder of the current [`ModelMetadata`] snapshot
#[derive(Debug)]
pub struct ModelStore {
    dir: PathBuf,
    current: RwLock<Arc<ModelMetadata>>,
}

impl ModelStore {
    /// Load models from `dir`; on failure start in CDHS fallback mode
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let metadata = match ModelMetadata::load_dir(&dir) {
            Ok(metadata) => {
                info!(
                    "Loaded ML models version {} from {}",
                    metadata.version().unwrap_or("unknown"),
                    dir.display()
                );
                metadata
            }
            Err(e) => {
                warn!("ML models unavailable ({}), falling back to CDHS-only scoring", e);
                ModelMetadata::fallback(e.to_string())
            }
        };
        Self::with_metadata(dir, metadata)
    }

    pub fn with_metadata(dir: impl Into<PathBuf>, metadata: ModelMetadata) -> Self {
        Self {
            dir: dir.into(),
            current: RwLock::new(Arc::new(metadata)),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.dir
    }

    /// Current snapshot; stays valid for the caller across reloads
    pub fn snapshot(&self) -> Arc<ModelMetadata> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild the snapshot from disk and publish it
    ///
    /// On failure the previous snapshot stays active.
    pub fn reload(&self) -> Result<Arc<ModelMetadata>, ModelUnavailableError> {
        let metadata = Arc::new(ModelMetadata::load_dir(&self.dir)?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&metadata);
        info!(
            "Reloaded ML models version {}",
            metadata.version().unwrap_or("unknown")
        );
        Ok(metadata)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    /// Write a small model set: one regressor stump and one classifier stump
    /// splitting on equilibrium temperature
    pub fn write_models(dir: &Path, version: &str) {
        let metadata = serde_json::json!({
            "version": version,
            "feature_names": crate::features::FEATURE_NAMES,
            "regressor": "regressor.json",
            "classifier": "classifier.json"
        });
        std::fs::write(dir.join(super::METADATA_FILE), metadata.to_string()).unwrap();
        let regressor = r#"{"trees": [{"nodes": [
            {"feature": 5, "threshold": 400.0, "left": 1, "right": 2},
            {"value": 0.9}, {"value": 0.1}
        ]}]}"#;
        let classifier = r#"{"trees": [{"nodes": [
            {"feature": 5, "threshold": 400.0, "left": 1, "right": 2},
            {"value": 3.0}, {"value": -3.0}
        ]}]}"#;
        std::fs::write(dir.join("regressor.json"), regressor).unwrap();
        std::fs::write(dir.join("classifier.json"), classifier).unwrap();
    }
}
