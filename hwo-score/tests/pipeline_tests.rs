//! End-to-end pipeline properties: mapping, scoring, batch and observability

use hwo_common::{InstrumentParams, WavelengthBand};
use hwo_score::batch;
use hwo_score::cdhs::CdhsScorer;
use hwo_score::csv_input::parse_csv;
use hwo_score::mapping::{CanonicalField, SchemaMapper};
use hwo_score::ml::ModelMetadata;
use hwo_score::normalize::normalize;
use hwo_score::observability::{self, ReferenceCatalog, DEFAULT_THRESHOLD};
use hwo_score::scoring::ScoringEngine;
use hwo_score::types::{HabitabilityClass, RawRow, RawValue};

fn row(cells: &[(&str, &str)]) -> RawRow {
    cells
        .iter()
        .map(|(k, v)| (k.to_string(), RawValue::from_cell(v)))
        .collect()
}

fn headers_of(row: &RawRow) -> Vec<String> {
    row.keys().cloned().collect()
}

#[test]
fn test_kepler_442b_example() {
    let raw = row(&[
        ("pl_name", "Kepler-442b"),
        ("pl_rade", "1.34"),
        ("pl_orbper", "112.3"),
        ("sy_dist", "370"),
        ("st_spectype", "K"),
    ]);
    let report = SchemaMapper::default().map(&headers_of(&raw), std::slice::from_ref(&raw));
    assert!(report.can_proceed);
    assert!(report.missing_required.is_empty());

    let engine = ScoringEngine::default();
    let result = engine
        .score_row(&raw, &report.detected_mapping, &ModelMetadata::fallback("none"))
        .unwrap();
    assert!((0.0..=100.0).contains(&result.characterization_score));
    assert!(matches!(
        result.habitability_class,
        HabitabilityClass::Poor
            | HabitabilityClass::Marginal
            | HabitabilityClass::Promising
            | HabitabilityClass::Excellent
    ));
}

#[test]
fn test_planet_column_maps_to_name() {
    let raw = row(&[
        ("Planet", "Kepler-442b"),
        ("pl_rade", "1.34"),
        ("pl_orbper", "112.3"),
        ("sy_dist", "370"),
        ("st_spectype", "K"),
    ]);
    let report = SchemaMapper::default().map(&headers_of(&raw), std::slice::from_ref(&raw));
    assert_eq!(report.detected_mapping.get(CanonicalField::Name), Some("Planet"));
    assert!(report.can_proceed);
}

#[test]
fn test_cdhs_bounds_over_input_grid() {
    let scorer = CdhsScorer::default();
    let mapper = SchemaMapper::default();
    for radius in ["0.05", "0.5", "1.0", "2.2", "15"] {
        for period in ["0.5", "12", "365", "4000", "90000"] {
            for temperature in ["", "40", "288", "500", "2500"] {
                for eccentricity in ["", "0", "0.4", "0.99"] {
                    let raw = row(&[
                        ("name", "grid"),
                        ("distance_pc", "20"),
                        ("star_type", "M"),
                        ("planet_radius_earth", radius),
                        ("orbital_period_days", period),
                        ("temperature_k", temperature),
                        ("eccentricity", eccentricity),
                    ]);
                    let report = mapper.map(&headers_of(&raw), &[]);
                    let target = normalize(&raw, &report.detected_mapping).unwrap();
                    let breakdown = scorer.score(&target);
                    for value in [
                        breakdown.temperature_factor,
                        breakdown.radius_factor,
                        breakdown.flux_factor,
                        breakdown.stability_factor,
                        breakdown.composite,
                    ] {
                        assert!((0.0..=100.0).contains(&value), "{} out of range", value);
                    }
                }
            }
        }
    }
}

#[test]
fn test_batch_accounts_for_every_row() {
    let csv = "\
name,distance_pc,star_type,planet_radius_earth,orbital_period_days,stellar_mass_solar
a,10,G,1.0,365,1.0
b,-3,K,1.0,200,
c,12,,1.0,100,0.8
d,14,M,1.5,nope,0.3
e,6,K,0.9,250,0.7
";
    let table = parse_csv(csv).unwrap();
    let response = batch::run(
        &table.headers,
        &table.rows,
        &ScoringEngine::default(),
        &ModelMetadata::fallback("none"),
    )
    .unwrap();
    assert_eq!(
        response.results.len() + response.summary.errors.len(),
        table.rows.len()
    );
    let names: Vec<_> = response.results.iter().map(|r| r.target_name.as_str()).collect();
    assert_eq!(names, vec!["a", "e"]);
    let failed: Vec<_> = response
        .summary
        .errors
        .iter()
        .map(|e| e.row_identifier.as_str())
        .collect();
    assert_eq!(failed, vec!["b", "c", "d"]);
}

#[test]
fn test_larger_iwa_never_increases_count() {
    let catalog = ReferenceCatalog::builtin();
    for band in WavelengthBand::ALL {
        for diameter_m in [2.0, 6.0, 15.0] {
            let mut previous = usize::MAX;
            for iwa_mas in [1.0, 20.0, 75.0, 150.0, 500.0, 1000.0] {
                let params = InstrumentParams {
                    diameter_m,
                    wavelength_band: band,
                    iwa_mas,
                    contrast_sensitivity: 1e-10,
                };
                let count = observability::count(catalog.targets(), &params, DEFAULT_THRESHOLD).unwrap();
                assert!(count <= previous, "count rose at iwa {} ({:?}, D {})", iwa_mas, band, diameter_m);
                previous = count;
            }
        }
    }
}

#[test]
fn test_count_matches_per_target_flags() {
    let catalog = ReferenceCatalog::builtin();
    let params = InstrumentParams {
        diameter_m: 6.0,
        wavelength_band: WavelengthBand::Visible,
        iwa_mas: 75.0,
        contrast_sensitivity: 1e-10,
    };
    for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let expected = catalog
            .targets()
            .iter()
            .map(|t| observability::score(t, &params).unwrap())
            .filter(|r| r.detectable && r.signal_margin >= threshold)
            .count();
        assert_eq!(observability::count(catalog.targets(), &params, threshold).unwrap(), expected);
    }
}
