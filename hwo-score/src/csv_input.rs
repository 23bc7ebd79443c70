//! CSV request bodies into headers + raw rows
//!
//! `#` comment lines (NASA Exoplanet Archive exports) and a UTF-8 BOM are
//! skipped. Every cell is kept as text; typing happens in the normalizer.
//! Ragged rows are accepted: short rows are padded with empty cells, extra
//! cells are dropped.

use std::collections::HashSet;

use thiserror::Error;

use crate::types::{RawRow, RawValue};

#[derive(Debug, Error)]
pub enum CsvInputError {
    #[error("CSV body is empty")]
    Empty,

    #[error("CSV has a header row but no data rows")]
    NoRows,

    #[error("malformed CSV: {0}")]
    Malformed(#[from] csv::Error),
}

/// Parsed CSV table
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Parse a CSV document
///
/// Blank header cells are named `column_<n>` (1-based). A repeated header
/// gets a `_2`, `_3`, ... suffix so no column is shadowed.
pub fn parse_csv(body: &str) -> Result<CsvTable, CsvInputError> {
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    if body.trim().is_empty() {
        return Err(CsvInputError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let raw_headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            if h.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                h.to_string()
            }
        })
        .collect();
    let headers = dedupe_headers(raw_headers);
    if headers.is_empty() {
        return Err(CsvInputError::Empty);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.clone(), RawValue::from_cell(record.get(idx).unwrap_or(""))))
            .collect();
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(CsvInputError::NoRows);
    }

    Ok(CsvTable { headers, rows })
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let originals: HashSet<String> = headers.iter().cloned().collect();
    let mut used: HashSet<String> = HashSet::with_capacity(headers.len());
    headers
        .into_iter()
        .map(|header| {
            if used.insert(header.clone()) {
                return header;
            }
            let mut n = 2;
            loop {
                let candidate = format!("{}_{}", header, n);
                if !originals.contains(&candidate) && used.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}
