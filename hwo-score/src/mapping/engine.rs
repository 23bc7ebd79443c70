//! Column matching engine
//!
//! Two phases:
//! 1. Exact: normalised header equals a field alias (confidence 1.0)
//! 2. Fuzzy: candidates for every unresolved field are pooled and assigned
//!    greedily by descending confidence, so a header is claimed by the field
//!    it fits best rather than the first field that asks for it.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tracing::debug;

use super::fields::{CanonicalField, FieldTier};
use super::utils::{
    containment_score, is_uncertainty_column, normalize_header, numeric_fraction,
    prefix_equivalent, similarity,
};
use super::ColumnMapping;
use crate::types::RawRow;

/// Overall verdict on a header set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    MissingRequiredFields,
    LowConfidence,
}

/// Required fields could not be resolved
#[derive(Debug, Clone, PartialEq, Error)]
#[error("required columns could not be mapped: {}", join_fields(.missing_required))]
pub struct MappingError {
    pub missing_required: Vec<CanonicalField>,
    /// Closest unmapped headers per missing field
    pub suggestions: BTreeMap<CanonicalField, Vec<String>>,
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(CanonicalField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Mapping plus diagnostics (`validate-columns` response body)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingReport {
    pub detected_mapping: ColumnMapping,
    pub confidence_scores: BTreeMap<CanonicalField, f64>,
    pub missing_required: Vec<CanonicalField>,
    pub missing_optional: Vec<CanonicalField>,
    /// Fields with no column that will use their documented default
    pub defaulted_fields: Vec<CanonicalField>,
    pub unmapped_headers: Vec<String>,
    pub mapping_quality: f64,
    /// Missing field -> field standing in for it
    pub substitutions: BTreeMap<CanonicalField, CanonicalField>,
    pub suggestions: BTreeMap<CanonicalField, Vec<String>>,
    pub validation_status: ValidationStatus,
    pub can_proceed: bool,
}

impl MappingReport {
    /// Fail with a [`MappingError`] unless every required field is satisfied
    pub fn ensure_can_proceed(&self) -> Result<(), MappingError> {
        if self.can_proceed {
            return Ok(());
        }
        let suggestions = self
            .suggestions
            .iter()
            .filter(|(field, _)| self.missing_required.contains(field))
            .map(|(field, headers)| (*field, headers.clone()))
            .collect();
        Err(MappingError {
            missing_required: self.missing_required.clone(),
            suggestions,
        })
    }
}

/// Matching thresholds
#[derive(Debug, Clone)]
pub struct MatchThresholds {
    /// Fuzzy candidates below this are discarded
    pub min_confidence: f64,
    /// Jaro-Winkler similarity needed for a fuzzy candidate
    pub similarity_min: f64,
    /// Scale applied to a Jaro-Winkler similarity to get a confidence
    pub similarity_scale: f64,
    /// Confidence of a catalogue-prefix equivalence
    pub prefix_confidence: f64,
    /// Aliases shorter than this never take part in fuzzy matching
    pub min_fuzzy_alias_len: usize,
    /// Aliases shorter than this are not compared by similarity
    pub min_similarity_alias_len: usize,
    /// Similarity needed for a header to be suggested for a missing field
    pub suggestion_min: f64,
    pub max_suggestions: usize,
    /// Sample values inspected per column
    pub sample_limit: usize,
    /// Numeric fields reject fuzzy candidates below this numeric share
    pub min_numeric_fraction: f64,
    /// Quality below this is reported as low confidence
    pub low_quality: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.60,
            similarity_min: 0.88,
            similarity_scale: 0.85,
            prefix_confidence: 0.80,
            min_fuzzy_alias_len: 3,
            min_similarity_alias_len: 5,
            suggestion_min: 0.70,
            max_suggestions: 3,
            sample_limit: 20,
            min_numeric_fraction: 0.5,
            low_quality: 0.5,
        }
    }
}

#[derive(Debug)]
struct Candidate {
    confidence: f64,
    field: CanonicalField,
    header_idx: usize,
}

/// Schema Mapper
///
/// Stateless; the same headers and sample always produce the same report.
#[derive(Debug, Clone, Default)]
pub struct SchemaMapper {
    thresholds: MatchThresholds,
}

impl SchemaMapper {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    /// Map `headers` onto canonical fields, using `sample` for type sniffing
    pub fn map(&self, headers: &[String], sample: &[RawRow]) -> MappingReport {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut mapping = ColumnMapping::default();
        let mut confidence_scores = BTreeMap::new();

        // Phase 1: exact alias match, earliest alias first, then header order
        for field in CanonicalField::ALL {
            let best = normalized
                .iter()
                .enumerate()
                .filter(|(idx, _)| !mapping.is_claimed(&headers[*idx]))
                .filter_map(|(idx, norm)| {
                    field
                        .aliases()
                        .iter()
                        .position(|alias| alias == norm)
                        .map(|alias_idx| (alias_idx, idx))
                })
                .min();
            if let Some((_, idx)) = best {
                if mapping.insert(field, headers[idx].clone()) {
                    confidence_scores.insert(field, 1.0);
                }
            }
        }

        // Phase 2: pooled fuzzy candidates, assigned greedily
        let mut candidates = Vec::new();
        for field in CanonicalField::ALL {
            if mapping.contains(field) {
                continue;
            }
            for (idx, norm) in normalized.iter().enumerate() {
                if norm.is_empty() || mapping.is_claimed(&headers[idx]) || is_uncertainty_column(norm) {
                    continue;
                }
                let Some(confidence) = self.fuzzy_confidence(norm, field) else {
                    continue;
                };
                if confidence < self.thresholds.min_confidence {
                    continue;
                }
                if !self.sample_supports(field, &headers[idx], sample) {
                    debug!(
                        "Rejected '{}' for {}: sample values are not numeric",
                        headers[idx], field
                    );
                    continue;
                }
                candidates.push(Candidate {
                    confidence,
                    field,
                    header_idx: idx,
                });
            }
        }
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then(a.field.cmp(&b.field))
                .then(a.header_idx.cmp(&b.header_idx))
        });
        for candidate in candidates {
            let header = &headers[candidate.header_idx];
            if mapping.insert(candidate.field, header.clone()) {
                debug!(
                    "Fuzzy matched '{}' -> {} ({:.2})",
                    header, candidate.field, candidate.confidence
                );
                confidence_scores.insert(candidate.field, candidate.confidence);
            }
        }

        self.build_report(headers, &normalized, mapping, confidence_scores)
    }

    fn build_report(
        &self,
        headers: &[String],
        normalized: &[String],
        mapping: ColumnMapping,
        confidence_scores: BTreeMap<CanonicalField, f64>,
    ) -> MappingReport {
        let mut substitutions = BTreeMap::new();
        for field in CanonicalField::ALL {
            if let Some(substitute) = field.substitute() {
                if !mapping.contains(field) && mapping.contains(substitute) {
                    substitutions.insert(field, substitute);
                }
            }
        }
        let satisfied =
            |field: &CanonicalField| mapping.contains(*field) || substitutions.contains_key(field);

        let missing_in_tier = |tier: FieldTier| -> Vec<CanonicalField> {
            CanonicalField::ALL
                .into_iter()
                .filter(|f| f.tier() == tier && !satisfied(f))
                .collect()
        };
        let missing_required = missing_in_tier(FieldTier::Required);
        let missing_optional = missing_in_tier(FieldTier::Optional);
        let defaulted_fields = missing_in_tier(FieldTier::Defaulted);

        let counted: Vec<CanonicalField> = CanonicalField::ALL
            .into_iter()
            .filter(CanonicalField::counts_toward_quality)
            .collect();
        let mapped_count = counted.iter().filter(|f| satisfied(f)).count();
        let mapping_quality = mapped_count as f64 / counted.len() as f64;

        let claimed: HashSet<&str> = mapping.iter().map(|(_, c)| c).collect();
        let unmapped: Vec<(usize, &String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !claimed.contains(h.as_str()))
            .collect();

        let mut suggestions = BTreeMap::new();
        for field in missing_required
            .iter()
            .chain(defaulted_fields.iter())
            .chain(missing_optional.iter())
        {
            let found = self.suggest(*field, &unmapped, normalized);
            if !found.is_empty() {
                suggestions.insert(*field, found);
            }
        }

        let can_proceed = missing_required.is_empty();
        let validation_status = if !can_proceed {
            ValidationStatus::MissingRequiredFields
        } else if mapping_quality < self.thresholds.low_quality {
            ValidationStatus::LowConfidence
        } else {
            ValidationStatus::Valid
        };

        debug!(
            "Column mapping: {} of {} fields mapped, quality {:.2}, can_proceed={}",
            mapping.len(),
            CanonicalField::ALL.len(),
            mapping_quality,
            can_proceed
        );

        MappingReport {
            detected_mapping: mapping,
            confidence_scores,
            missing_required,
            missing_optional,
            defaulted_fields,
            unmapped_headers: unmapped.into_iter().map(|(_, h)| h.clone()).collect(),
            mapping_quality,
            substitutions,
            suggestions,
            validation_status,
            can_proceed,
        }
    }

    /// Best fuzzy confidence of `header` against any alias of `field`
    fn fuzzy_confidence(&self, header: &str, field: CanonicalField) -> Option<f64> {
        let t = &self.thresholds;
        field
            .aliases()
            .iter()
            .filter(|alias| alias.len() >= t.min_fuzzy_alias_len)
            .filter_map(|alias| {
                let mut best = containment_score(header, alias);
                if prefix_equivalent(header, alias) {
                    best = Some(best.map_or(t.prefix_confidence, |c| c.max(t.prefix_confidence)));
                }
                if alias.len() >= t.min_similarity_alias_len {
                    let sim = similarity(header, alias);
                    if sim >= t.similarity_min {
                        let scaled = sim * t.similarity_scale;
                        best = Some(best.map_or(scaled, |c| c.max(scaled)));
                    }
                }
                best
            })
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }

    /// Numeric fields need mostly numeric sample values; empty samples pass
    fn sample_supports(&self, field: CanonicalField, header: &str, sample: &[RawRow]) -> bool {
        if !field.kind().is_numeric() {
            return true;
        }
        let values = sample
            .iter()
            .filter_map(|row| row.get(header))
            .take(self.thresholds.sample_limit);
        match numeric_fraction(values) {
            Some(fraction) => fraction >= self.thresholds.min_numeric_fraction,
            None => true,
        }
    }

    fn suggest(
        &self,
        field: CanonicalField,
        unmapped: &[(usize, &String)],
        normalized: &[String],
    ) -> Vec<String> {
        let mut scored: Vec<(f64, usize, &String)> = unmapped
            .iter()
            .filter_map(|(idx, header)| {
                let norm = &normalized[*idx];
                let best = field
                    .aliases()
                    .iter()
                    .filter(|alias| alias.len() >= self.thresholds.min_fuzzy_alias_len)
                    .map(|alias| similarity(norm, alias))
                    .fold(0.0_f64, f64::max);
                (best >= self.thresholds.suggestion_min).then_some((best, *idx, *header))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored
            .into_iter()
            .take(self.thresholds.max_suggestions)
            .map(|(_, _, header)| header.clone())
            .collect()
    }
}
