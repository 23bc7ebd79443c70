//! Prediction against a model snapshot, with CDHS fallback

use serde::{Deserialize, Serialize};

use super::ModelMetadata;
use crate::features::FeatureVector;

/// Ceiling on confidence reported without a real model
pub const FALLBACK_CONFIDENCE_CEILING: f64 = 0.3;

/// How a prediction was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMode {
    Ensemble,
    CdhsFallback,
}

/// Raw model outputs attached to a score result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    /// [0, 1]
    pub regression_score: f64,
    /// [0, 1]
    pub classification_probability: f64,
    /// [0, 1]; independent of the CDHS composite when models are loaded
    pub confidence: f64,
    pub mode: PredictionMode,
    pub model_version: Option<String>,
}

/// Predict habitability for one feature vector
///
/// `cdhs_composite` (0-100) is only used in fallback mode. A snapshot with a
/// single model reuses that model's value for the missing output.
pub fn predict(snapshot: &ModelMetadata, features: &FeatureVector, cdhs_composite: f64) -> MlPrediction {
    if snapshot.is_degraded() {
        let estimate = (cdhs_composite / 100.0).clamp(0.0, 1.0);
        return MlPrediction {
            regression_score: estimate,
            classification_probability: estimate,
            confidence: FALLBACK_CONFIDENCE_CEILING * features.completeness(),
            mode: PredictionMode::CdhsFallback,
            model_version: None,
        };
    }

    let inputs = snapshot.model_inputs(features);
    let regression = snapshot.regressor().map(|m| m.predict(&inputs));
    let classification = snapshot.classifier().map(|m| m.predict(&inputs));

    let outputs: Vec<_> = regression.iter().chain(classification.iter()).collect();
    let confidence = outputs.iter().map(|o| o.confidence).sum::<f64>() / outputs.len() as f64;
    let regression_score = regression.or(classification).map_or(0.0, |o| o.value);
    let classification_probability = classification.or(regression).map_or(0.0, |o| o.value);

    MlPrediction {
        regression_score: regression_score.clamp(0.0, 1.0),
        classification_probability: classification_probability.clamp(0.0, 1.0),
        confidence: confidence.clamp(0.0, 1.0),
        mode: PredictionMode::Ensemble,
        model_version: snapshot.version().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::store::test_support::write_models;
    use crate::normalize::CanonicalTarget;
    use std::collections::BTreeSet;

    fn target(temperature_k: Option<f64>) -> CanonicalTarget {
        CanonicalTarget {
            name: "t".to_string(),
            distance_pc: 10.0,
            star_type: "G".to_string(),
            planet_radius_earth: 1.0,
            orbital_period_days: 365.25,
            stellar_mass_solar: 1.0,
            planet_mass_earth: Some(1.0),
            temperature_k,
            discovery_year: Some(2020),
            detection_method: Some("Transit".to_string()),
            data_quality: "Good".to_string(),
            semi_major_axis_au: None,
            eccentricity: Some(0.0),
            stellar_temperature_k: None,
            estimated: BTreeSet::new(),
        }
    }

    #[test]
    fn test_fallback_uses_cdhs_with_low_confidence() {
        let snapshot = ModelMetadata::fallback("no models");
        let features = FeatureVector::from_target(&target(Some(288.0)));
        let prediction = predict(&snapshot, &features, 80.0);
        assert_eq!(prediction.mode, PredictionMode::CdhsFallback);
        assert!((prediction.regression_score - 0.8).abs() < 1e-12);
        assert_eq!(prediction.classification_probability, prediction.regression_score);
        assert!(prediction.confidence <= FALLBACK_CONFIDENCE_CEILING);
        assert_eq!(prediction.model_version, None);
    }

    #[test]
    fn test_ensemble_prediction() {
        let dir = tempfile::tempdir().unwrap();
        write_models(dir.path(), "v7");
        let snapshot = ModelMetadata::load_dir(dir.path()).unwrap();

        let temperate = predict(&snapshot, &FeatureVector::from_target(&target(Some(288.0))), 10.0);
        assert_eq!(temperate.mode, PredictionMode::Ensemble);
        assert_eq!(temperate.model_version.as_deref(), Some("v7"));
        assert!((temperate.regression_score - 0.9).abs() < 1e-12);
        assert!(temperate.classification_probability > 0.9);
        // CDHS composite does not leak into ensemble output
        let other = predict(&snapshot, &FeatureVector::from_target(&target(Some(288.0))), 95.0);
        assert_eq!(temperate, other);

        let hot = predict(&snapshot, &FeatureVector::from_target(&target(Some(900.0))), 10.0);
        assert!((hot.regression_score - 0.1).abs() < 1e-12);
        assert!(hot.classification_probability < 0.1);
    }
}
