//! Batch Orchestrator
//!
//! Maps the columns once, then normalises and scores every row against that
//! mapping. Row failures are collected in the summary instead of aborting the
//! batch. Rows run in parallel on the rayon pool; outputs are merged back in
//! input order so the response is identical to a sequential run.

use rayon::prelude::*;
use tracing::{debug, info};
use uuid::Uuid;

use crate::mapping::MappingError;
use crate::ml::ModelMetadata;
use crate::normalize::row_identifier;
use crate::scoring::ScoringEngine;
use crate::types::{BatchRowError, BatchScoringResponse, BatchSummary, RawRow, ScoreResult};

/// Rows handed to the Schema Mapper for type sniffing
pub const SAMPLE_ROWS: usize = 20;

/// Score a batch of raw rows
///
/// Blocking and CPU-bound; call from `spawn_blocking` in async contexts. Fails
/// only when the column mapping cannot proceed.
pub fn run(
    headers: &[String],
    rows: &[RawRow],
    engine: &ScoringEngine,
    snapshot: &ModelMetadata,
) -> Result<BatchScoringResponse, MappingError> {
    let sample = &rows[..rows.len().min(SAMPLE_ROWS)];
    let report = engine.mapper().map(headers, sample);
    report.ensure_can_proceed()?;
    let mapping = report.detected_mapping;

    let mut outcomes: Vec<(usize, Result<ScoreResult, BatchRowError>)> = rows
        .par_iter()
        .enumerate()
        .map(|(idx, row)| {
            let outcome = engine.score_row(row, &mapping, snapshot).map_err(|e| {
                let row_number = idx + 1;
                let error = e.at_row(row_number);
                debug!("Row {} rejected: {}", row_number, error);
                BatchRowError {
                    row_identifier: row_identifier(row, &mapping, row_number),
                    reason: error.to_string(),
                }
            });
            (idx, outcome)
        })
        .collect();

    // Indexed collect already preserves order; sorting keeps the merge explicit.
    outcomes.sort_by_key(|(idx, _)| *idx);

    let mut results = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary {
        batch_id: Uuid::new_v4(),
        total: rows.len(),
        successful: results.len(),
        failed: errors.len(),
        errors,
        column_mapping: mapping,
        degraded_mode: snapshot.is_degraded(),
    };
    info!(
        "Batch {} scored: {} total, {} successful, {} failed{}",
        summary.batch_id,
        summary.total,
        summary.successful,
        summary.failed,
        if summary.degraded_mode { " (degraded mode)" } else { "" }
    );

    Ok(BatchScoringResponse { results, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::CanonicalField;
    use crate::types::RawValue;

    fn table(headers: &[&str], rows: &[&[&str]]) -> (Vec<String>, Vec<RawRow>) {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|cells| {
                headers
                    .iter()
                    .zip(cells.iter())
                    .map(|(h, c)| (h.clone(), RawValue::from_cell(c)))
                    .collect()
            })
            .collect();
        (headers, rows)
    }

    #[test]
    fn test_failed_rows_do_not_abort_batch() {
        let (headers, rows) = table(
            &["pl_name", "sy_dist", "st_spectype", "pl_rade", "pl_orbper"],
            &[
                &["A", "10", "G", "1.0", "365"],
                &["B", "abc", "K", "1.2", "200"],
                &["", "12", "M", "0.9", "20"],
                &["D", "8", "K", "1.1", "300"],
            ],
        );
        let response = run(&headers, &rows, &ScoringEngine::default(), &ModelMetadata::fallback("none")).unwrap();

        assert_eq!(response.results.len() + response.summary.errors.len(), rows.len());
        assert_eq!(response.summary.total, 4);
        assert_eq!(response.summary.successful, 2);
        assert_eq!(response.summary.failed, 2);
        assert!(response.summary.degraded_mode);

        let names: Vec<_> = response.results.iter().map(|r| r.target_name.as_str()).collect();
        assert_eq!(names, vec!["A", "D"]);
        assert_eq!(response.summary.errors[0].row_identifier, "B");
        assert!(response.summary.errors[0].reason.contains("distance_pc"));
        assert_eq!(response.summary.errors[1].row_identifier, "row 3");
        assert_eq!(response.summary.column_mapping.get(CanonicalField::Name), Some("pl_name"));
    }

    #[test]
    fn test_order_is_input_order() {
        let names: Vec<String> = (0..200).map(|i| format!("T{:03}", i)).collect();
        let headers: Vec<String> = ["name", "distance_pc", "star_type", "planet_radius_earth", "orbital_period_days"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let rows: Vec<RawRow> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values = [
                    name.clone(),
                    format!("{}", 5 + i % 40),
                    "G".to_string(),
                    "1.1".to_string(),
                    format!("{}", 100 + i),
                ];
                headers
                    .iter()
                    .zip(values.iter())
                    .map(|(h, v)| (h.clone(), RawValue::from_cell(v)))
                    .collect()
            })
            .collect();

        let engine = ScoringEngine::default();
        let snapshot = ModelMetadata::fallback("none");
        let first = run(&headers, &rows, &engine, &snapshot).unwrap();
        let second = run(&headers, &rows, &engine, &snapshot).unwrap();

        let order: Vec<_> = first.results.iter().map(|r| r.target_name.clone()).collect();
        assert_eq!(order, names);
        assert_eq!(first.results, second.results);
    }

    #[test]
    fn test_unmappable_batch_fails_as_a_whole() {
        let (headers, rows) = table(&["foo", "bar"], &[&["1", "2"]]);
        let err = run(&headers, &rows, &ScoringEngine::default(), &ModelMetadata::fallback("none")).unwrap_err();
        assert!(err.missing_required.contains(&CanonicalField::Name));
    }
}
