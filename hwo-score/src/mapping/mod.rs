//! Schema Mapper
//!
//! Resolves arbitrary input column names onto the canonical target schema.
//! Mapping is computed once per header set from headers plus a bounded
//! sample, never from the full data.

pub mod engine;
pub mod fields;
pub mod utils;

pub use engine::{MappingError, MappingReport, SchemaMapper, ValidationStatus};
pub use fields::{CanonicalField, FieldKind, FieldTier};

use serde::Serialize;
use std::collections::BTreeMap;

/// Canonical field -> source column
///
/// Immutable once built by the mapper. No two fields share a source column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    entries: BTreeMap<CanonicalField, String>,
}

impl ColumnMapping {
    /// Source column mapped to `field`
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.entries.contains_key(&field)
    }

    /// True when `column` already backs some field
    pub fn is_claimed(&self, column: &str) -> bool {
        self.entries.values().any(|c| c == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.entries.iter().map(|(f, c)| (*f, c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Claim `column` for `field`; refuses a column or field already taken
    pub(crate) fn insert(&mut self, field: CanonicalField, column: String) -> bool {
        if self.entries.contains_key(&field) || self.is_claimed(&column) {
            return false;
        }
        self.entries.insert(field, column);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_claimed_once() {
        let mut mapping = ColumnMapping::default();
        assert!(mapping.insert(CanonicalField::Name, "pl_name".to_string()));
        assert!(!mapping.insert(CanonicalField::StarType, "pl_name".to_string()));
        assert!(!mapping.insert(CanonicalField::Name, "other".to_string()));
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get(CanonicalField::Name), Some("pl_name"));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let mut mapping = ColumnMapping::default();
        mapping.insert(CanonicalField::DistancePc, "sy_dist".to_string());
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json, serde_json::json!({"distance_pc": "sy_dist"}));
    }
}
