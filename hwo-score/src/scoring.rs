//! Per-target scoring: normalise, derive features, run CDHS and the ML
//! predictor, then blend
//!
//! The engine holds configuration only; every call is a pure function of its
//! inputs and the model snapshot passed in.

use hwo_common::config::ScoringConfig;
use std::collections::BTreeSet;
use tracing::debug;

use crate::cdhs::{CdhsBreakdown, CdhsScorer};
use crate::features::FeatureVector;
use crate::mapping::{ColumnMapping, MappingError, MappingReport, SchemaMapper};
use crate::ml::{self, ModelMetadata};
use crate::normalize::{self, CanonicalTarget, RowError};
use crate::types::{DetailedScores, HabitabilityClass, ObservationPriority, RawRow, ScoreResult};

/// ML share of the blended score when not configured
pub const DEFAULT_ML_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    mapper: SchemaMapper,
    cdhs: CdhsScorer,
    ml_weight: f64,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self {
            mapper: SchemaMapper::default(),
            cdhs: CdhsScorer::default(),
            ml_weight: DEFAULT_ML_WEIGHT,
        }
    }
}

impl ScoringEngine {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            mapper: SchemaMapper::default(),
            cdhs: CdhsScorer::from_config(config),
            ml_weight: config.ml_weight.clamp(0.0, 1.0),
        }
    }

    pub fn mapper(&self) -> &SchemaMapper {
        &self.mapper
    }

    pub fn ml_weight(&self) -> f64 {
        self.ml_weight
    }

    /// Map the columns of a single JSON target
    ///
    /// The row doubles as the type-sniffing sample.
    pub fn map_single(&self, row: &RawRow) -> Result<(ColumnMapping, MappingReport), MappingError> {
        let headers: Vec<String> = row.keys().cloned().collect();
        let report = self.mapper.map(&headers, std::slice::from_ref(row));
        report.ensure_can_proceed()?;
        Ok((report.detected_mapping.clone(), report))
    }

    /// Score one raw row under an already computed mapping
    pub fn score_row(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        snapshot: &ModelMetadata,
    ) -> Result<ScoreResult, RowError> {
        let target = normalize::normalize(row, mapping)?;
        let mut result = self.score_target(&target, snapshot);
        result.original_data = normalize::unmapped_cells(row, mapping);
        Ok(result)
    }

    /// Score a normalised target; `original_data` is left empty
    pub fn score_target(&self, target: &CanonicalTarget, snapshot: &ModelMetadata) -> ScoreResult {
        let features = FeatureVector::from_target(target);
        let cdhs = self.cdhs.score_features(target, &features);
        let prediction = ml::predict(snapshot, &features, cdhs.composite);

        let habitability_score = self.blend(prediction.regression_score, cdhs.composite);
        let confidence = prediction.confidence;
        debug!(
            "Scored {}: composite {:.1}, blended {:.3}, confidence {:.2}",
            target.name, cdhs.composite, habitability_score, confidence
        );

        ScoreResult {
            target_name: target.name.clone(),
            characterization_score: cdhs.composite,
            habitability_score,
            habitability_class: HabitabilityClass::from_score(habitability_score),
            ai_confidence: confidence,
            observation_priority: ObservationPriority::from_score(habitability_score, confidence),
            detailed_scores: detailed_scores(target, &features, cdhs),
            ml_predictions: prediction,
            original_data: Default::default(),
        }
    }

    /// `w * regression + (1 - w) * composite / 100`, clamped to [0, 1]
    pub fn blend(&self, regression_score: f64, composite: f64) -> f64 {
        let w = self.ml_weight;
        (w * regression_score + (1.0 - w) * composite / 100.0).clamp(0.0, 1.0)
    }
}

fn detailed_scores(target: &CanonicalTarget, features: &FeatureVector, cdhs: CdhsBreakdown) -> DetailedScores {
    let mut estimated: BTreeSet<String> = target.estimated.iter().map(|f| f.as_str().to_string()).collect();
    estimated.extend(features.estimated_features().into_iter().map(str::to_string));
    estimated.extend(cdhs.assumed_inputs);

    DetailedScores {
        temperature_factor: cdhs.temperature_factor,
        radius_factor: cdhs.radius_factor,
        flux_factor: cdhs.flux_factor,
        stability_factor: cdhs.stability_factor,
        composite: cdhs.composite,
        distance_factor: cdhs.distance_factor,
        star_type_factor: cdhs.star_type_factor,
        data_quality_factor: cdhs.data_quality_factor,
        estimated_fields: estimated.into_iter().collect(),
        non_finite_inputs: cdhs.non_finite_inputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::store::test_support::write_models;
    use crate::ml::PredictionMode;
    use crate::types::RawValue;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::from_cell(v)))
            .collect()
    }

    fn kepler_442b() -> RawRow {
        row(&[
            ("pl_name", "Kepler-442b"),
            ("pl_rade", "1.34"),
            ("pl_orbper", "112.3"),
            ("sy_dist", "370"),
            ("st_spectype", "K"),
        ])
    }

    #[test]
    fn test_blend_is_documented_fixed_combination() {
        let engine = ScoringEngine::default();
        assert!((engine.blend(0.8, 40.0) - 0.6).abs() < 1e-12);
        assert_eq!(engine.blend(2.0, 400.0), 1.0);

        let config = ScoringConfig {
            ml_weight: 1.0,
            ..ScoringConfig::default()
        };
        let ml_only = ScoringEngine::from_config(&config);
        assert!((ml_only.blend(0.8, 0.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_score_row_degraded() {
        let engine = ScoringEngine::default();
        let raw = kepler_442b();
        let (mapping, _) = engine.map_single(&raw).unwrap();
        let snapshot = ModelMetadata::fallback("none");
        let result = engine.score_row(&raw, &mapping, &snapshot).unwrap();

        assert_eq!(result.target_name, "Kepler-442b");
        assert!((0.0..=100.0).contains(&result.characterization_score));
        assert!((0.0..=1.0).contains(&result.habitability_score));
        assert_eq!(result.ml_predictions.mode, PredictionMode::CdhsFallback);
        assert!(result.ai_confidence <= 0.3);
        // Low confidence can never earn high priority
        assert_ne!(result.observation_priority, ObservationPriority::High);
        assert!(result
            .detailed_scores
            .estimated_fields
            .contains(&"stellar_mass_solar".to_string()));
        assert!(result
            .detailed_scores
            .estimated_fields
            .contains(&"eccentricity".to_string()));
    }

    #[test]
    fn test_unmapped_cells_pass_through() {
        let engine = ScoringEngine::default();
        let mut raw = kepler_442b();
        raw.insert("disc_facility".to_string(), RawValue::from_cell("Kepler"));
        let (mapping, _) = engine.map_single(&raw).unwrap();
        let result = engine
            .score_row(&raw, &mapping, &ModelMetadata::fallback("none"))
            .unwrap();
        assert_eq!(
            result.original_data.get("disc_facility"),
            Some(&RawValue::from_cell("Kepler"))
        );
        assert!(!result.original_data.contains_key("pl_name"));
    }

    #[test]
    fn test_score_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_models(dir.path(), "v1");
        let snapshot = ModelMetadata::load_dir(dir.path()).unwrap();
        let engine = ScoringEngine::default();
        let raw = kepler_442b();
        let (mapping, _) = engine.map_single(&raw).unwrap();

        let first = engine.score_row(&raw, &mapping, &snapshot).unwrap();
        let second = engine.score_row(&raw, &mapping, &snapshot).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ml_predictions.mode, PredictionMode::Ensemble);
    }

    #[test]
    fn test_missing_required_value_rejects_row() {
        let engine = ScoringEngine::default();
        let raw = kepler_442b();
        let (mapping, _) = engine.map_single(&raw).unwrap();
        let mut broken = raw.clone();
        broken.insert("sy_dist".to_string(), RawValue::from_cell("far"));
        let err = engine
            .score_row(&broken, &mapping, &ModelMetadata::fallback("none"))
            .unwrap_err();
        assert_eq!(err.field, crate::mapping::CanonicalField::DistancePc);
    }

    #[test]
    fn test_map_single_requires_name() {
        let engine = ScoringEngine::default();
        let raw = row(&[("pl_rade", "1.0"), ("sy_dist", "10")]);
        assert!(engine.map_single(&raw).is_err());
    }
}
