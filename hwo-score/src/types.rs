//! Shared request/response types
//!
//! Raw input cells, per-target score results and batch responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::mapping::ColumnMapping;
use crate::ml::MlPrediction;

/// One raw input cell
///
/// CSV cells arrive as text; JSON bodies may carry numbers or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Empty,
}

impl RawValue {
    /// Build from a CSV cell; blank cells become `Empty`
    pub fn from_cell(cell: &str) -> Self {
        if cell.trim().is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(cell.to_string())
        }
    }

    /// Convert a JSON value; nested arrays/objects are kept as their JSON text
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Empty,
            serde_json::Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Empty),
            serde_json::Value::String(s) => RawValue::from_cell(s),
            serde_json::Value::Bool(b) => RawValue::Text(b.to_string()),
            other => RawValue::Text(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Number(_) => false,
        }
    }

    /// Single numeric parse attempt; non-finite values are rejected
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RawValue::Empty => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Trimmed text form; numbers are rendered without a trailing ".0"
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Empty => None,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawValue::Number(n) => Some(n.to_string()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Empty => f.write_str(""),
        }
    }
}

/// One input line: column name -> raw cell
pub type RawRow = BTreeMap<String, RawValue>;

/// Habitability bucket of the blended score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HabitabilityClass {
    Poor,
    Marginal,
    Promising,
    Excellent,
}

impl HabitabilityClass {
    /// Poor < 0.3 <= Marginal < 0.5 <= Promising < 0.75 <= Excellent
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            HabitabilityClass::Poor
        } else if score < 0.5 {
            HabitabilityClass::Marginal
        } else if score < 0.75 {
            HabitabilityClass::Promising
        } else {
            HabitabilityClass::Excellent
        }
    }
}

/// Coarse ranking bucket for observation planning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationPriority {
    High,
    Medium,
    Low,
}

impl ObservationPriority {
    /// High needs both a strong score and a confident prediction
    pub fn from_score(score: f64, confidence: f64) -> Self {
        if score >= 0.75 && confidence >= 0.6 {
            ObservationPriority::High
        } else if score < 0.4 {
            ObservationPriority::Low
        } else {
            ObservationPriority::Medium
        }
    }
}

/// Sub-factor breakdown attached to every score result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedScores {
    pub temperature_factor: f64,
    pub radius_factor: f64,
    pub flux_factor: f64,
    pub stability_factor: f64,
    pub composite: f64,
    /// Observational characterisation factors (not part of the composite)
    pub distance_factor: f64,
    pub star_type_factor: f64,
    pub data_quality_factor: f64,
    /// Inputs that were defaulted or inferred rather than measured
    pub estimated_fields: Vec<String>,
    /// Inputs that were NaN/infinite and replaced by the neutral midpoint
    pub non_finite_inputs: Vec<String>,
}

/// Per-target scoring output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub target_name: String,
    /// CDHS composite, 0-100
    pub characterization_score: f64,
    /// Blended ML + CDHS score, 0-1
    pub habitability_score: f64,
    pub habitability_class: HabitabilityClass,
    /// 0-1
    pub ai_confidence: f64,
    pub observation_priority: ObservationPriority,
    pub detailed_scores: DetailedScores,
    pub ml_predictions: MlPrediction,
    /// Raw cells the column mapping did not consume, passed through for display
    pub original_data: BTreeMap<String, RawValue>,
}

/// One failed row in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRowError {
    /// Target name when readable, otherwise "row <n>" (1-based)
    pub row_identifier: String,
    pub reason: String,
}

/// Batch outcome counters
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<BatchRowError>,
    /// Mapping applied to every row, kept for auditability
    pub column_mapping: ColumnMapping,
    /// True when scores were produced without ML models
    pub degraded_mode: bool,
}

/// Batch scoring response
#[derive(Debug, Clone, Serialize)]
pub struct BatchScoringResponse {
    pub results: Vec<ScoreResult>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_numeric_parse() {
        assert_eq!(RawValue::Text(" 1.34 ".to_string()).as_f64(), Some(1.34));
        assert_eq!(RawValue::Number(370.0).as_f64(), Some(370.0));
        assert_eq!(RawValue::Text("K5V".to_string()).as_f64(), None);
        assert_eq!(RawValue::Text("nan".to_string()).as_f64(), None);
        assert_eq!(RawValue::Text("inf".to_string()).as_f64(), None);
        assert_eq!(RawValue::Empty.as_f64(), None);
    }

    #[test]
    fn test_raw_value_from_json() {
        assert_eq!(RawValue::from_json(&serde_json::json!(null)), RawValue::Empty);
        assert_eq!(RawValue::from_json(&serde_json::json!(2)), RawValue::Number(2.0));
        assert_eq!(RawValue::from_json(&serde_json::json!("  ")), RawValue::Empty);
        assert_eq!(
            RawValue::from_json(&serde_json::json!("G2V")),
            RawValue::Text("G2V".to_string())
        );
    }

    #[test]
    fn test_class_thresholds() {
        assert_eq!(HabitabilityClass::from_score(0.0), HabitabilityClass::Poor);
        assert_eq!(HabitabilityClass::from_score(0.3), HabitabilityClass::Marginal);
        assert_eq!(HabitabilityClass::from_score(0.5), HabitabilityClass::Promising);
        assert_eq!(HabitabilityClass::from_score(0.75), HabitabilityClass::Excellent);
    }

    #[test]
    fn test_priority_rules() {
        assert_eq!(ObservationPriority::from_score(0.8, 0.7), ObservationPriority::High);
        // Strong score without confidence stays Medium
        assert_eq!(ObservationPriority::from_score(0.8, 0.3), ObservationPriority::Medium);
        assert_eq!(ObservationPriority::from_score(0.39, 0.9), ObservationPriority::Low);
        assert_eq!(ObservationPriority::from_score(0.5, 0.9), ObservationPriority::Medium);
    }
}
