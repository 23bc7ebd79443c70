//! Reference target catalogue for observability counts

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{map_observability_columns, targets_from_rows, ObservabilityTarget};
use crate::csv_input::parse_csv;
use crate::mapping::SchemaMapper;

/// Where the catalogue came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogSource {
    Builtin,
    File { path: PathBuf },
}

/// Well-known nearby and habitable-zone planets:
/// (name, distance pc, radius Earth radii, host Teff K)
const BUILTIN_TARGETS: &[(&str, f64, f64, f64)] = &[
    ("Proxima Cen b", 1.30, 1.07, 3042.0),
    ("Ross 128 b", 3.37, 1.11, 3192.0),
    ("GJ 273 b", 3.80, 1.51, 3382.0),
    ("Teegarden's Star b", 3.83, 1.02, 2904.0),
    ("GJ 1061 d", 3.67, 1.15, 2953.0),
    ("Wolf 1061 c", 4.31, 1.66, 3342.0),
    ("tau Cet e", 3.60, 1.81, 5344.0),
    ("eps Eri b", 3.22, 12.9, 5084.0),
    ("GJ 667 C c", 7.24, 1.54, 3350.0),
    ("TRAPPIST-1 e", 12.43, 0.92, 2566.0),
    ("HD 40307 g", 12.94, 2.39, 4977.0),
    ("55 Cnc f", 12.59, 7.59, 5196.0),
    ("47 UMa b", 13.80, 13.3, 5892.0),
    ("LHS 1140 b", 14.99, 1.73, 3216.0),
    ("Kepler-442 b", 370.0, 1.34, 4402.0),
    ("Kepler-452 b", 551.7, 1.63, 5757.0),
];

/// Targets the `count` operation runs against
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    targets: Vec<ObservabilityTarget>,
    source: CatalogSource,
}

impl ReferenceCatalog {
    pub fn builtin() -> Self {
        let targets = BUILTIN_TARGETS
            .iter()
            .map(|(name, distance_pc, radius, teff)| ObservabilityTarget {
                id: name.to_string(),
                distance_pc: *distance_pc,
                planet_radius_earth: *radius,
                stellar_temperature_k: Some(*teff),
            })
            .collect();
        Self {
            targets,
            source: CatalogSource::Builtin,
        }
    }

    /// Load from a CSV using the schema mapper's column aliases
    ///
    /// Invalid rows are skipped with a warning.
    pub fn load_csv(path: &Path) -> crate::ApiResult<Self> {
        let body = std::fs::read_to_string(path).map_err(|e| {
            crate::ApiError::Internal(format!("Read catalog {} failed: {}", path.display(), e))
        })?;
        let table = parse_csv(&body)?;
        let mapping = map_observability_columns(&SchemaMapper::default(), &table.headers, &table.rows)?;
        let (targets, errors) = targets_from_rows(&mapping, &table.rows);
        for error in &errors {
            warn!("Skipping catalog row {}: {}", error.row_identifier, error.reason);
        }
        Ok(Self {
            targets,
            source: CatalogSource::File {
                path: path.to_path_buf(),
            },
        })
    }

    /// Configured catalogue, falling back to the built-in list
    pub fn from_config(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::load_csv(path) {
            Ok(catalog) => {
                info!("Loaded {} reference targets from {}", catalog.len(), path.display());
                catalog
            }
            Err(e) => {
                warn!("Catalog {} unusable ({}), using built-in targets", path.display(), e);
                Self::builtin()
            }
        }
    }

    pub fn targets(&self) -> &[ObservabilityTarget] {
        &self.targets
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_targets_are_valid() {
        let catalog = ReferenceCatalog::builtin();
        assert_eq!(catalog.len(), BUILTIN_TARGETS.len());
        assert!(catalog.targets().iter().all(|t| t.validate().is_ok()));
        assert_eq!(catalog.source(), &CatalogSource::Builtin);
    }

    #[test]
    fn test_load_csv_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Planet,Distance [pc],Radius,Teff").unwrap();
        writeln!(file, "A,4.0,1.0,5000").unwrap();
        writeln!(file, "B,bad,1.0,5000").unwrap();
        let catalog = ReferenceCatalog::load_csv(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.targets()[0].id, "A");
    }

    #[test]
    fn test_unusable_catalog_falls_back() {
        let catalog = ReferenceCatalog::from_config(Some(Path::new("/nonexistent/catalog.csv")));
        assert_eq!(catalog.source(), &CatalogSource::Builtin);
    }
}
