//! Observability Scorer
//!
//! Direct-imaging detectability of a planet in its host star's habitable
//! zone, for a given telescope/coronagraph configuration:
//!
//! - HZ orbit: `L = (Teff / 5778)^7.37`, `a = sqrt(L)` AU
//! - angular separation: `sep = 1000 * a / d` mas
//! - effective IWA: `max(iwa_mas, 2.44 * lambda / D)`
//! - reflected-light contrast: `0.3 * (Rp / a)^2`
//!
//! A target is detectable when `sep` exceeds the effective IWA and its
//! contrast is at or above the instrument's sensitivity floor. All functions
//! are pure; results are recomputed for every parameter set.

pub mod catalog;

pub use catalog::{CatalogSource, ReferenceCatalog};

use hwo_common::instrument::validate_threshold;
use hwo_common::{InstrumentParamError, InstrumentParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::{CanonicalField, ColumnMapping, SchemaMapper};
use crate::types::{BatchRowError, RawRow, RawValue};

/// Solar effective temperature (K)
pub const SOLAR_TEFF_K: f64 = 5778.0;

/// Main-sequence luminosity-temperature exponent
const LUMINOSITY_EXPONENT: f64 = 7.37;

/// Geometric albedo x phase factor in the contrast estimate
const REFLECTED_LIGHT_FACTOR: f64 = 0.3;

/// Earth radius in AU
const EARTH_RADIUS_AU: f64 = 4.2635e-5;

/// Milliarcseconds per radian
const MAS_PER_RADIAN: f64 = 206_264_806.247;

/// Diffraction-limited IWA in units of lambda / D
const DIFFRACTION_IWA_LAMBDA_OVER_D: f64 = 2.44;

/// Margin threshold used by the live channel and when none is given
pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObservabilityError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error(transparent)]
    InstrumentParam(#[from] InstrumentParamError),
}

/// Astrophysical inputs of one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityTarget {
    #[serde(alias = "pl_name", alias = "name", alias = "target_id")]
    pub id: String,
    #[serde(alias = "sy_dist")]
    pub distance_pc: f64,
    #[serde(alias = "pl_rade")]
    pub planet_radius_earth: f64,
    /// Host star Teff; solar when absent
    #[serde(default, alias = "st_teff")]
    pub stellar_temperature_k: Option<f64>,
}

impl ObservabilityTarget {
    pub fn validate(&self) -> Result<(), ObservabilityError> {
        let invalid = |reason: &str| ObservabilityError::InvalidTarget {
            target: self.id.clone(),
            reason: reason.to_string(),
        };
        if !(self.distance_pc.is_finite() && self.distance_pc > 0.0) {
            return Err(invalid("distance_pc must be a positive number"));
        }
        if !(self.planet_radius_earth.is_finite() && self.planet_radius_earth > 0.0) {
            return Err(invalid("planet_radius_earth must be a positive number"));
        }
        if let Some(teff) = self.stellar_temperature_k {
            if !(teff.is_finite() && teff > 0.0) {
                return Err(invalid("stellar_temperature_k must be a positive number"));
            }
        }
        Ok(())
    }
}

/// Intermediate quantities behind a detectability verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributingFactors {
    pub stellar_temperature_k: f64,
    /// True when the solar Teff was assumed
    pub stellar_temperature_assumed: bool,
    pub stellar_luminosity_solar: f64,
    pub habitable_zone_au: f64,
    pub separation_mas: f64,
    pub wavelength_um: f64,
    pub diffraction_limit_mas: f64,
    pub effective_iwa_mas: f64,
    pub contrast_ratio: f64,
    pub contrast_sensitivity: f64,
    pub contrast_ok: bool,
    pub required_diameter_m: f64,
    pub iwa_score: f64,
    pub spectroscopic_score: f64,
    pub diameter_score: f64,
}

/// Detectability of one target under one parameter set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservabilityResult {
    pub target_id: String,
    pub detectable: bool,
    /// Observability score in [0, 1]
    pub signal_margin: f64,
    pub contributing_factors: ContributingFactors,
}

/// Diffraction-limited inner working angle (mas)
pub fn diffraction_limit_mas(params: &InstrumentParams) -> f64 {
    let wavelength_m = params.wavelength_band.wavelength_um() * 1e-6;
    DIFFRACTION_IWA_LAMBDA_OVER_D * wavelength_m / params.diameter_m * MAS_PER_RADIAN
}

/// Score one target; parameters are validated first
pub fn score(
    target: &ObservabilityTarget,
    params: &InstrumentParams,
) -> Result<ObservabilityResult, ObservabilityError> {
    params.validate()?;
    target.validate()?;
    Ok(score_unchecked(target, params))
}

fn score_unchecked(target: &ObservabilityTarget, params: &InstrumentParams) -> ObservabilityResult {
    let teff = target.stellar_temperature_k.unwrap_or(SOLAR_TEFF_K);
    let luminosity = (teff / SOLAR_TEFF_K).powf(LUMINOSITY_EXPONENT);
    let hz_au = luminosity.sqrt();
    let separation_mas = 1000.0 * hz_au / target.distance_pc;

    let wavelength_um = params.wavelength_band.wavelength_um();
    let diffraction_mas = diffraction_limit_mas(params);
    let effective_iwa_mas = params.iwa_mas.max(diffraction_mas);

    let radius_au = target.planet_radius_earth * EARTH_RADIUS_AU;
    let contrast = REFLECTED_LIGHT_FACTOR * (radius_au / hz_au).powi(2);
    let contrast_ok = contrast >= params.contrast_sensitivity;

    let separation_rad = separation_mas / MAS_PER_RADIAN;
    let required_diameter_m = DIFFRACTION_IWA_LAMBDA_OVER_D * wavelength_um * 1e-6 / separation_rad;

    let iwa_score = (separation_mas / effective_iwa_mas - 0.5).clamp(0.0, 1.0);
    let spectroscopic_score = (((contrast / params.contrast_sensitivity).log10() + 1.0) / 2.0).clamp(0.0, 1.0);
    let diameter_score = 1.0 - ((required_diameter_m - params.diameter_m) / required_diameter_m).max(0.0);
    let signal_margin = (0.4 * iwa_score + 0.4 * spectroscopic_score + 0.2 * diameter_score).clamp(0.0, 1.0);

    ObservabilityResult {
        target_id: target.id.clone(),
        detectable: separation_mas > effective_iwa_mas && contrast_ok,
        signal_margin,
        contributing_factors: ContributingFactors {
            stellar_temperature_k: teff,
            stellar_temperature_assumed: target.stellar_temperature_k.is_none(),
            stellar_luminosity_solar: luminosity,
            habitable_zone_au: hz_au,
            separation_mas,
            wavelength_um,
            diffraction_limit_mas: diffraction_mas,
            effective_iwa_mas,
            contrast_ratio: contrast,
            contrast_sensitivity: params.contrast_sensitivity,
            contrast_ok,
            required_diameter_m,
            iwa_score,
            spectroscopic_score,
            diameter_score,
        },
    }
}

/// Targets detectable with margin at or above `threshold`
///
/// Invalid targets are never counted.
pub fn count(
    targets: &[ObservabilityTarget],
    params: &InstrumentParams,
    threshold: f64,
) -> Result<usize, ObservabilityError> {
    params.validate()?;
    validate_threshold(threshold)?;
    Ok(targets
        .iter()
        .filter(|t| t.validate().is_ok())
        .map(|t| score_unchecked(t, params))
        .filter(|r| r.detectable && r.signal_margin >= threshold)
        .count())
}

/// Read observability targets from mapped raw rows
///
/// Rows missing a name, distance or radius become row errors.
pub fn targets_from_rows(
    mapping: &ColumnMapping,
    rows: &[RawRow],
) -> (Vec<ObservabilityTarget>, Vec<BatchRowError>) {
    let mut targets = Vec::new();
    let mut errors = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let cell = |field: CanonicalField| mapping.get(field).and_then(|c| row.get(c));
        let id = cell(CanonicalField::Name)
            .and_then(RawValue::as_text)
            .unwrap_or_else(|| format!("row {}", idx + 1));
        let target = ObservabilityTarget {
            distance_pc: cell(CanonicalField::DistancePc)
                .and_then(RawValue::as_f64)
                .unwrap_or(f64::NAN),
            planet_radius_earth: cell(CanonicalField::PlanetRadiusEarth)
                .and_then(RawValue::as_f64)
                .unwrap_or(f64::NAN),
            stellar_temperature_k: cell(CanonicalField::StellarTemperatureK).and_then(RawValue::as_f64),
            id,
        };
        match target.validate() {
            Ok(()) => targets.push(target),
            Err(e) => errors.push(BatchRowError {
                row_identifier: target.id.clone(),
                reason: e.to_string(),
            }),
        }
    }
    (targets, errors)
}

/// Map headers for observability input; only name, distance and radius are
/// needed
pub fn map_observability_columns(
    mapper: &SchemaMapper,
    headers: &[String],
    sample: &[RawRow],
) -> Result<ColumnMapping, ObservabilityError> {
    let report = mapper.map(headers, sample);
    let missing: Vec<&str> = [
        CanonicalField::Name,
        CanonicalField::DistancePc,
        CanonicalField::PlanetRadiusEarth,
    ]
    .into_iter()
    .filter(|f| !report.detected_mapping.contains(*f))
    .map(|f| f.as_str())
    .collect();
    if !missing.is_empty() {
        return Err(ObservabilityError::InvalidTarget {
            target: "CSV".to_string(),
            reason: format!("missing columns: {}", missing.join(", ")),
        });
    }
    Ok(report.detected_mapping)
}

/// CSV export of observability results
pub fn export_csv(results: &[ObservabilityResult]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "pl_name",
        "separation_mas",
        "contrast_ratio",
        "required_diameter_m",
        "spectroscopic_score",
        "iwa_score",
        "observability_score",
        "detectable",
    ])?;
    for result in results {
        let f = &result.contributing_factors;
        writer.write_record([
            result.target_id.clone(),
            format!("{:.3}", f.separation_mas),
            format!("{:.3e}", f.contrast_ratio),
            format!("{:.3}", f.required_diameter_m),
            format!("{:.4}", f.spectroscopic_score),
            format!("{:.4}", f.iwa_score),
            format!("{:.4}", result.signal_margin),
            result.detectable.to_string(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
