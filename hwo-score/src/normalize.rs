//! Feature Normalizer
//!
//! Turns one raw row plus the batch's [`ColumnMapping`] into a typed
//! [`CanonicalTarget`]. Each mapped cell gets exactly one parse attempt.
//! Required fields that are missing or unparseable reject the row; defaulted
//! fields fall back to their documented value and are tagged as estimated.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

use crate::mapping::{CanonicalField, ColumnMapping};
use crate::types::{RawRow, RawValue};

/// Stellar mass used when the row has none (solar masses)
pub const DEFAULT_STELLAR_MASS_SOLAR: f64 = 1.0;

/// Data quality grade used when the row has none
pub const DEFAULT_DATA_QUALITY: &str = "Good";

/// Days per Julian year
const DAYS_PER_YEAR: f64 = 365.25;

/// Per-row parse/type failure
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{field}: {reason}")]
pub struct RowError {
    /// 1-based input row, when known
    pub row: Option<usize>,
    pub field: CanonicalField,
    pub reason: String,
}

impl RowError {
    fn new(field: CanonicalField, reason: impl Into<String>) -> Self {
        Self {
            row: None,
            field,
            reason: reason.into(),
        }
    }

    /// Attach the 1-based row number
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

/// Typed, unit-consistent target
///
/// Units: distance pc, radius Earth radii, period days, planet mass Earth
/// masses, stellar mass solar masses, temperatures K.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTarget {
    pub name: String,
    pub distance_pc: f64,
    pub star_type: String,
    pub planet_radius_earth: f64,
    pub orbital_period_days: f64,
    pub stellar_mass_solar: f64,
    pub planet_mass_earth: Option<f64>,
    pub temperature_k: Option<f64>,
    pub discovery_year: Option<i32>,
    pub detection_method: Option<String>,
    pub data_quality: String,
    pub semi_major_axis_au: Option<f64>,
    pub eccentricity: Option<f64>,
    pub stellar_temperature_k: Option<f64>,
    /// Fields filled from a default or derived from other fields
    pub estimated: BTreeSet<CanonicalField>,
}

impl CanonicalTarget {
    pub fn is_estimated(&self, field: CanonicalField) -> bool {
        self.estimated.contains(&field)
    }
}

/// Mapped, non-empty cell for `field`
fn cell<'a>(row: &'a RawRow, mapping: &ColumnMapping, field: CanonicalField) -> Option<&'a RawValue> {
    mapping
        .get(field)
        .and_then(|column| row.get(column))
        .filter(|value| !value.is_empty())
}

fn required_text(row: &RawRow, mapping: &ColumnMapping, field: CanonicalField) -> Result<String, RowError> {
    cell(row, mapping, field)
        .and_then(RawValue::as_text)
        .ok_or_else(|| RowError::new(field, "missing value"))
}

fn required_positive(row: &RawRow, mapping: &ColumnMapping, field: CanonicalField) -> Result<f64, RowError> {
    let raw = cell(row, mapping, field).ok_or_else(|| RowError::new(field, "missing value"))?;
    let value = raw
        .as_f64()
        .ok_or_else(|| RowError::new(field, format!("not a number ('{}')", raw)))?;
    if value <= 0.0 {
        return Err(RowError::new(field, format!("must be positive, got {}", value)));
    }
    Ok(value)
}

/// Optional numeric cell; unparseable or out-of-domain values count as absent
fn optional_f64(
    row: &RawRow,
    mapping: &ColumnMapping,
    field: CanonicalField,
    valid: impl Fn(f64) -> bool,
) -> Option<f64> {
    let raw = cell(row, mapping, field)?;
    match raw.as_f64() {
        Some(value) if valid(value) => Some(value),
        _ => {
            debug!("Ignoring unusable {} value '{}'", field, raw);
            None
        }
    }
}

/// Orbital period from semi-major axis by Kepler's third law
pub fn period_from_semi_major_axis(semi_major_axis_au: f64, stellar_mass_solar: f64) -> f64 {
    DAYS_PER_YEAR * (semi_major_axis_au.powi(3) / stellar_mass_solar).sqrt()
}

/// Normalise one raw row
pub fn normalize(row: &RawRow, mapping: &ColumnMapping) -> Result<CanonicalTarget, RowError> {
    let mut estimated = BTreeSet::new();

    let name = required_text(row, mapping, CanonicalField::Name)?;
    let distance_pc = required_positive(row, mapping, CanonicalField::DistancePc)?;
    let star_type = required_text(row, mapping, CanonicalField::StarType)?;
    let planet_radius_earth = required_positive(row, mapping, CanonicalField::PlanetRadiusEarth)?;

    let stellar_mass_solar = optional_f64(row, mapping, CanonicalField::StellarMassSolar, |m| m > 0.0)
        .unwrap_or_else(|| {
            estimated.insert(CanonicalField::StellarMassSolar);
            DEFAULT_STELLAR_MASS_SOLAR
        });

    let semi_major_axis_au = optional_f64(row, mapping, CanonicalField::SemiMajorAxisAu, |a| a > 0.0);

    let orbital_period_days = if cell(row, mapping, CanonicalField::OrbitalPeriodDays).is_some() {
        required_positive(row, mapping, CanonicalField::OrbitalPeriodDays)?
    } else if let Some(a) = semi_major_axis_au {
        estimated.insert(CanonicalField::OrbitalPeriodDays);
        period_from_semi_major_axis(a, stellar_mass_solar)
    } else {
        return Err(RowError::new(
            CanonicalField::OrbitalPeriodDays,
            "missing value (no semi_major_axis_au to derive it from)",
        ));
    };

    let data_quality = cell(row, mapping, CanonicalField::DataQuality)
        .and_then(RawValue::as_text)
        .unwrap_or_else(|| {
            estimated.insert(CanonicalField::DataQuality);
            DEFAULT_DATA_QUALITY.to_string()
        });

    let discovery_year = optional_f64(row, mapping, CanonicalField::DiscoveryYear, |y| {
        y.fract() == 0.0 && (1000.0..=9999.0).contains(&y)
    })
    .map(|y| y as i32);

    Ok(CanonicalTarget {
        name,
        distance_pc,
        star_type,
        planet_radius_earth,
        orbital_period_days,
        stellar_mass_solar,
        planet_mass_earth: optional_f64(row, mapping, CanonicalField::PlanetMassEarth, |m| m > 0.0),
        temperature_k: optional_f64(row, mapping, CanonicalField::TemperatureK, |t| t > 0.0),
        discovery_year,
        detection_method: cell(row, mapping, CanonicalField::DetectionMethod).and_then(RawValue::as_text),
        data_quality,
        semi_major_axis_au,
        eccentricity: optional_f64(row, mapping, CanonicalField::Eccentricity, |e| (0.0..=1.0).contains(&e)),
        stellar_temperature_k: optional_f64(row, mapping, CanonicalField::StellarTemperatureK, |t| t > 0.0),
        estimated,
    })
}

/// Raw cells whose column backs no canonical field
pub fn unmapped_cells(row: &RawRow, mapping: &ColumnMapping) -> BTreeMap<String, RawValue> {
    row.iter()
        .filter(|(column, _)| !mapping.is_claimed(column))
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}

/// Best-effort row label for error reports: the name cell, else `row <n>`
pub fn row_identifier(row: &RawRow, mapping: &ColumnMapping, row_number: usize) -> String {
    cell(row, mapping, CanonicalField::Name)
        .and_then(RawValue::as_text)
        .unwrap_or_else(|| format!("row {}", row_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SchemaMapper;

    fn raw(cells: &[(&str, &str)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), RawValue::from_cell(v)))
            .collect()
    }

    fn mapping_for(row: &RawRow) -> ColumnMapping {
        let headers: Vec<String> = row.keys().cloned().collect();
        SchemaMapper::default()
            .map(&headers, std::slice::from_ref(row))
            .detected_mapping
    }

    fn kepler_442b() -> RawRow {
        raw(&[
            ("pl_name", "Kepler-442b"),
            ("pl_rade", "1.34"),
            ("pl_orbper", "112.3"),
            ("sy_dist", "370"),
            ("st_spectype", "K"),
        ])
    }

    #[test]
    fn test_required_fields_parsed() {
        let row = kepler_442b();
        let target = normalize(&row, &mapping_for(&row)).unwrap();
        assert_eq!(target.name, "Kepler-442b");
        assert_eq!(target.distance_pc, 370.0);
        assert_eq!(target.planet_radius_earth, 1.34);
        assert_eq!(target.orbital_period_days, 112.3);
        assert_eq!(target.star_type, "K");
    }

    #[test]
    fn test_defaults_are_tagged_estimated() {
        let row = kepler_442b();
        let target = normalize(&row, &mapping_for(&row)).unwrap();
        assert_eq!(target.stellar_mass_solar, DEFAULT_STELLAR_MASS_SOLAR);
        assert_eq!(target.data_quality, DEFAULT_DATA_QUALITY);
        assert!(target.is_estimated(CanonicalField::StellarMassSolar));
        assert!(target.is_estimated(CanonicalField::DataQuality));
        assert!(!target.is_estimated(CanonicalField::DistancePc));
    }

    #[test]
    fn test_unparseable_required_field_rejects_row() {
        let mut row = kepler_442b();
        let mapping = mapping_for(&row);
        row.insert("sy_dist".to_string(), RawValue::Text("far".to_string()));
        let err = normalize(&row, &mapping).unwrap_err();
        assert_eq!(err.field, CanonicalField::DistancePc);
        assert!(err.reason.contains("far"));
    }

    #[test]
    fn test_missing_required_value_rejects_row() {
        let mut row = kepler_442b();
        let mapping = mapping_for(&row);
        row.insert("pl_rade".to_string(), RawValue::Empty);
        let err = normalize(&row, &mapping).unwrap_err().at_row(4);
        assert_eq!(err.field, CanonicalField::PlanetRadiusEarth);
        assert_eq!(err.row, Some(4));
    }

    #[test]
    fn test_non_finite_text_is_parse_failure() {
        let mut row = kepler_442b();
        let mapping = mapping_for(&row);
        row.insert("pl_orbper".to_string(), RawValue::Text("NaN".to_string()));
        let err = normalize(&row, &mapping).unwrap_err();
        assert_eq!(err.field, CanonicalField::OrbitalPeriodDays);
    }

    #[test]
    fn test_period_derived_from_semi_major_axis() {
        let row = raw(&[
            ("pl_name", "Earth twin"),
            ("pl_rade", "1.0"),
            ("pl_orbsmax", "1.0"),
            ("sy_dist", "10"),
            ("st_spectype", "G2V"),
            ("st_mass", "1.0"),
        ]);
        let target = normalize(&row, &mapping_for(&row)).unwrap();
        assert!((target.orbital_period_days - 365.25).abs() < 1e-9);
        assert!(target.is_estimated(CanonicalField::OrbitalPeriodDays));
        assert!(!target.is_estimated(CanonicalField::StellarMassSolar));
    }

    #[test]
    fn test_bad_optional_value_is_absent() {
        let mut row = kepler_442b();
        row.insert("pl_masse".to_string(), RawValue::Text("unknown".to_string()));
        row.insert("disc_year".to_string(), RawValue::Number(2015.0));
        let mapping = mapping_for(&row);
        let target = normalize(&row, &mapping).unwrap();
        assert_eq!(target.planet_mass_earth, None);
        assert_eq!(target.discovery_year, Some(2015));
    }

    #[test]
    fn test_unmapped_cells_and_identifier() {
        let mut row = kepler_442b();
        row.insert("notes".to_string(), RawValue::Text("HZ".to_string()));
        let mapping = mapping_for(&row);
        let extra = unmapped_cells(&row, &mapping);
        assert_eq!(extra.len(), 1);
        assert!(extra.contains_key("notes"));
        assert_eq!(row_identifier(&row, &mapping, 7), "Kepler-442b");
        assert_eq!(row_identifier(&RawRow::new(), &mapping, 7), "row 7");
    }
}
