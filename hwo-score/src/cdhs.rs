//! CDHS Scorer
//!
//! Deterministic multi-factor habitability score:
//!
//! `composite = 0.35 * temperature + 0.25 * radius + 0.20 * flux + 0.20 * stability`
//!
//! Each sub-factor is a trapezoid over its input clamped to [0, 100]: 100 on
//! the plateau, linear to 0 at the outer bound, 0 beyond. Non-finite inputs
//! score the neutral midpoint (50) and are reported.

use hwo_common::config::ScoringConfig;
use serde::Serialize;

use crate::features::{encode_data_quality, Feature, FeatureVector};
use crate::normalize::CanonicalTarget;

/// Score given to a factor whose input is unknown or non-finite
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Piecewise-linear preference curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trapezoid {
    pub outer_min: f64,
    pub plateau_min: f64,
    pub plateau_max: f64,
    pub outer_max: f64,
}

impl Trapezoid {
    pub const fn new(outer_min: f64, plateau_min: f64, plateau_max: f64, outer_max: f64) -> Self {
        Self {
            outer_min,
            plateau_min,
            plateau_max,
            outer_max,
        }
    }

    /// Score in [0, 100]; callers handle non-finite input
    pub fn score(&self, x: f64) -> f64 {
        let raw = if x <= self.outer_min || x >= self.outer_max {
            0.0
        } else if x < self.plateau_min {
            100.0 * (x - self.outer_min) / (self.plateau_min - self.outer_min)
        } else if x <= self.plateau_max {
            100.0
        } else {
            100.0 * (self.outer_max - x) / (self.outer_max - self.plateau_max)
        };
        raw.clamp(0.0, 100.0)
    }
}

/// Composite weights; sum to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdhsWeights {
    pub temperature: f64,
    pub radius: f64,
    pub flux: f64,
    pub stability: f64,
}

impl Default for CdhsWeights {
    fn default() -> Self {
        Self {
            temperature: 0.35,
            radius: 0.25,
            flux: 0.20,
            stability: 0.20,
        }
    }
}

/// Sub-factor breakdown, all values in [0, 100]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdhsBreakdown {
    pub temperature_factor: f64,
    pub radius_factor: f64,
    pub flux_factor: f64,
    pub stability_factor: f64,
    pub composite: f64,
    pub distance_factor: f64,
    pub star_type_factor: f64,
    pub data_quality_factor: f64,
    /// Inputs replaced by the neutral midpoint because they were NaN/infinite
    pub non_finite_inputs: Vec<String>,
    /// Inputs the score assumed rather than read (e.g. unknown eccentricity)
    pub assumed_inputs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CdhsScorer {
    temperature: Trapezoid,
    radius: Trapezoid,
    flux: Trapezoid,
    period_regularity: Trapezoid,
    weights: CdhsWeights,
}

impl Default for CdhsScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl CdhsScorer {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            temperature: Trapezoid::new(
                config.temperature_outer_min_k,
                273.0,
                373.0,
                config.temperature_outer_max_k,
            ),
            radius: Trapezoid::new(0.1, 0.5, 1.5, 3.0),
            flux: Trapezoid::new(0.1, 0.5, 2.0, 4.0),
            period_regularity: Trapezoid::new(10.0, 100.0, 1000.0, 5000.0),
            weights: CdhsWeights::default(),
        }
    }

    /// Score a target, deriving its features first
    pub fn score(&self, target: &CanonicalTarget) -> CdhsBreakdown {
        self.score_features(target, &FeatureVector::from_target(target))
    }

    /// Score a target whose feature vector is already built
    pub fn score_features(&self, target: &CanonicalTarget, features: &FeatureVector) -> CdhsBreakdown {
        let mut non_finite = Vec::new();
        let mut assumed = Vec::new();

        let temperature_factor = factor_or_neutral(
            "equilibrium_temp_k",
            features.get(Feature::EquilibriumTempK),
            &self.temperature,
            &mut non_finite,
        );
        let radius_factor = factor_or_neutral(
            "planet_radius_earth",
            features.get(Feature::PlanetRadiusEarth),
            &self.radius,
            &mut non_finite,
        );
        let flux_factor = factor_or_neutral(
            "insolation_earth",
            features.get(Feature::InsolationEarth),
            &self.flux,
            &mut non_finite,
        );

        let stability_factor = match target.eccentricity {
            None => {
                assumed.push("eccentricity".to_string());
                NEUTRAL_SCORE
            }
            Some(e) if !e.is_finite() => {
                non_finite.push("eccentricity".to_string());
                NEUTRAL_SCORE
            }
            Some(e) => {
                let regularity = factor_or_neutral(
                    "orbital_period_days",
                    features.get(Feature::OrbitalPeriodDays),
                    &self.period_regularity,
                    &mut non_finite,
                );
                let eccentricity_score = 100.0 * (1.0 - e.clamp(0.0, 1.0));
                (0.6 * eccentricity_score + 0.4 * regularity).clamp(0.0, 100.0)
            }
        };

        let w = &self.weights;
        let composite = (w.temperature * temperature_factor
            + w.radius * radius_factor
            + w.flux * flux_factor
            + w.stability * stability_factor)
            .clamp(0.0, 100.0);

        CdhsBreakdown {
            temperature_factor,
            radius_factor,
            flux_factor,
            stability_factor,
            composite,
            distance_factor: distance_factor(target.distance_pc),
            star_type_factor: star_type_factor(&target.star_type),
            data_quality_factor: encode_data_quality(&target.data_quality).unwrap_or(0.6) * 100.0,
            non_finite_inputs: non_finite,
            assumed_inputs: assumed,
        }
    }
}

fn factor_or_neutral(name: &str, x: f64, curve: &Trapezoid, non_finite: &mut Vec<String>) -> f64 {
    if x.is_finite() {
        curve.score(x)
    } else {
        non_finite.push(name.to_string());
        NEUTRAL_SCORE
    }
}

/// 100 within 5 pc, linear to 0 at 50 pc
pub fn distance_factor(distance_pc: f64) -> f64 {
    if !distance_pc.is_finite() {
        return NEUTRAL_SCORE;
    }
    (100.0 * (50.0 - distance_pc) / 45.0).clamp(0.0, 100.0)
}

/// Host star suitability for characterisation by spectral class
pub fn star_type_factor(star_type: &str) -> f64 {
    match star_type.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('G') => 100.0,
        Some('K') => 90.0,
        Some('F') => 70.0,
        Some('M') => 60.0,
        Some('A') => 30.0,
        _ => NEUTRAL_SCORE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::CanonicalField;
    use std::collections::BTreeSet;

    fn target() -> CanonicalTarget {
        CanonicalTarget {
            name: "Earth analog".to_string(),
            distance_pc: 10.0,
            star_type: "G2V".to_string(),
            planet_radius_earth: 1.0,
            orbital_period_days: 365.25,
            stellar_mass_solar: 1.0,
            planet_mass_earth: Some(1.0),
            temperature_k: Some(288.0),
            discovery_year: None,
            detection_method: None,
            data_quality: "Good".to_string(),
            semi_major_axis_au: None,
            eccentricity: Some(0.0),
            stellar_temperature_k: None,
            estimated: BTreeSet::new(),
        }
    }

    #[test]
    fn test_trapezoid_shape() {
        let t = Trapezoid::new(0.1, 0.5, 1.5, 3.0);
        assert_eq!(t.score(1.0), 100.0);
        assert_eq!(t.score(0.5), 100.0);
        assert_eq!(t.score(0.1), 0.0);
        assert_eq!(t.score(-5.0), 0.0);
        assert_eq!(t.score(10.0), 0.0);
        assert!((t.score(0.3) - 50.0).abs() < 1e-9);
        assert!((t.score(2.25) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_trapezoid_monotonic_each_side() {
        let t = Trapezoid::new(150.0, 273.0, 373.0, 450.0);
        let mut prev = 0.0;
        for k in 100..=273 {
            let s = t.score(k as f64);
            assert!(s >= prev);
            prev = s;
        }
        for k in 373..=600 {
            let s = t.score(k as f64);
            assert!(s <= prev);
            prev = s;
        }
    }

    #[test]
    fn test_earth_analog_scores_high() {
        let breakdown = CdhsScorer::default().score(&target());
        assert_eq!(breakdown.temperature_factor, 100.0);
        assert_eq!(breakdown.radius_factor, 100.0);
        assert_eq!(breakdown.flux_factor, 100.0);
        assert_eq!(breakdown.stability_factor, 100.0);
        assert_eq!(breakdown.composite, 100.0);
        assert_eq!(breakdown.star_type_factor, 100.0);
        assert_eq!(breakdown.data_quality_factor, 80.0);
    }

    #[test]
    fn test_unknown_eccentricity_is_neutral() {
        let mut t = target();
        t.eccentricity = None;
        let breakdown = CdhsScorer::default().score(&t);
        assert_eq!(breakdown.stability_factor, NEUTRAL_SCORE);
        assert_eq!(breakdown.assumed_inputs, vec!["eccentricity".to_string()]);
    }

    #[test]
    fn test_non_finite_input_neutral_and_flagged() {
        let mut t = target();
        t.temperature_k = Some(f64::NAN);
        let breakdown = CdhsScorer::default().score(&t);
        assert_eq!(breakdown.temperature_factor, NEUTRAL_SCORE);
        assert_eq!(breakdown.non_finite_inputs, vec!["equilibrium_temp_k".to_string()]);
        assert!((0.0..=100.0).contains(&breakdown.composite));
    }

    #[test]
    fn test_extreme_inputs_stay_in_range() {
        let mut t = target();
        t.planet_radius_earth = 1e9;
        t.orbital_period_days = 1e-9;
        t.temperature_k = Some(1e12);
        t.eccentricity = Some(5.0);
        t.estimated.insert(CanonicalField::StellarMassSolar);
        let b = CdhsScorer::default().score(&t);
        for value in [b.temperature_factor, b.radius_factor, b.flux_factor, b.stability_factor, b.composite] {
            assert!((0.0..=100.0).contains(&value), "{} out of range", value);
        }
    }

    #[test]
    fn test_score_is_deterministic() {
        let scorer = CdhsScorer::default();
        assert_eq!(scorer.score(&target()), scorer.score(&target()));
    }

    #[test]
    fn test_observational_factors() {
        assert_eq!(distance_factor(3.0), 100.0);
        assert_eq!(distance_factor(50.0), 0.0);
        assert!((distance_factor(27.5) - 50.0).abs() < 1e-9);
        assert_eq!(star_type_factor("K5V"), 90.0);
        assert_eq!(star_type_factor("WD"), NEUTRAL_SCORE);
    }

    #[test]
    fn test_configured_temperature_bounds() {
        let config = ScoringConfig {
            temperature_outer_min_k: 200.0,
            temperature_outer_max_k: 400.0,
            ..Default::default()
        };
        let mut t = target();
        t.temperature_k = Some(420.0);
        assert_eq!(CdhsScorer::from_config(&config).score(&t).temperature_factor, 0.0);
        assert!(CdhsScorer::default().score(&t).temperature_factor > 0.0);
    }
}
