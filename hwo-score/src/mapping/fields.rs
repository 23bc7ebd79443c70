//! Canonical target schema
//!
//! Every uploaded column is resolved onto one of these fields. Alias lists
//! are stored in normalised form (see [`super::utils::normalize_header`])
//! and are unique across fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How strongly a field is needed downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTier {
    /// Row is rejected without it; mapping cannot proceed without a column
    Required,
    /// Part of every target, falls back to a documented default
    Defaulted,
    /// Improves scoring when present
    Optional,
    /// Supporting inputs, not counted in mapping quality
    Auxiliary,
}

/// Parse type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Float,
    Integer,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Float | FieldKind::Integer)
    }
}

/// Canonical field names
///
/// Declaration order is the canonical order used for reports and tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Name,
    DistancePc,
    StarType,
    PlanetRadiusEarth,
    OrbitalPeriodDays,
    StellarMassSolar,
    PlanetMassEarth,
    TemperatureK,
    DiscoveryYear,
    DetectionMethod,
    DataQuality,
    SemiMajorAxisAu,
    Eccentricity,
    StellarTemperatureK,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 14] = [
        CanonicalField::Name,
        CanonicalField::DistancePc,
        CanonicalField::StarType,
        CanonicalField::PlanetRadiusEarth,
        CanonicalField::OrbitalPeriodDays,
        CanonicalField::StellarMassSolar,
        CanonicalField::PlanetMassEarth,
        CanonicalField::TemperatureK,
        CanonicalField::DiscoveryYear,
        CanonicalField::DetectionMethod,
        CanonicalField::DataQuality,
        CanonicalField::SemiMajorAxisAu,
        CanonicalField::Eccentricity,
        CanonicalField::StellarTemperatureK,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Name => "name",
            CanonicalField::DistancePc => "distance_pc",
            CanonicalField::StarType => "star_type",
            CanonicalField::PlanetRadiusEarth => "planet_radius_earth",
            CanonicalField::OrbitalPeriodDays => "orbital_period_days",
            CanonicalField::StellarMassSolar => "stellar_mass_solar",
            CanonicalField::PlanetMassEarth => "planet_mass_earth",
            CanonicalField::TemperatureK => "temperature_k",
            CanonicalField::DiscoveryYear => "discovery_year",
            CanonicalField::DetectionMethod => "detection_method",
            CanonicalField::DataQuality => "data_quality",
            CanonicalField::SemiMajorAxisAu => "semi_major_axis_au",
            CanonicalField::Eccentricity => "eccentricity",
            CanonicalField::StellarTemperatureK => "stellar_temperature_k",
        }
    }

    pub fn tier(&self) -> FieldTier {
        match self {
            CanonicalField::Name
            | CanonicalField::DistancePc
            | CanonicalField::StarType
            | CanonicalField::PlanetRadiusEarth
            | CanonicalField::OrbitalPeriodDays => FieldTier::Required,
            CanonicalField::StellarMassSolar => FieldTier::Defaulted,
            CanonicalField::PlanetMassEarth
            | CanonicalField::TemperatureK
            | CanonicalField::DiscoveryYear
            | CanonicalField::DetectionMethod
            | CanonicalField::DataQuality => FieldTier::Optional,
            CanonicalField::SemiMajorAxisAu
            | CanonicalField::Eccentricity
            | CanonicalField::StellarTemperatureK => FieldTier::Auxiliary,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            CanonicalField::Name
            | CanonicalField::StarType
            | CanonicalField::DetectionMethod
            | CanonicalField::DataQuality => FieldKind::Text,
            CanonicalField::DiscoveryYear => FieldKind::Integer,
            _ => FieldKind::Float,
        }
    }

    /// Counted in `mapping_quality`
    pub fn counts_toward_quality(&self) -> bool {
        self.tier() != FieldTier::Auxiliary
    }

    /// Field that can stand in for this one when it has no column
    pub fn substitute(&self) -> Option<CanonicalField> {
        match self {
            CanonicalField::OrbitalPeriodDays => Some(CanonicalField::SemiMajorAxisAu),
            _ => None,
        }
    }

    /// Accepted column names, normalised; the first entry is the canonical name
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Name => &[
                "name", "planet_name", "pl_name", "target_name", "object_name", "identifier",
                "designation", "common_name", "planet", "target", "object", "source_name",
                "catalogue_name", "exoplanet_name",
            ],
            CanonicalField::DistancePc => &[
                "distance_pc", "distance", "dist", "sy_dist", "dist_pc", "parallax_distance",
                "stellar_distance", "star_distance", "system_distance", "parsecs", "pc", "d",
                "dist_parsec", "distance_parsec",
            ],
            CanonicalField::StarType => &[
                "star_type", "stellar_type", "st_spectype", "spectral_type", "spec_type",
                "stellar_class", "star_class", "classification", "sptype", "spectype", "st_type",
                "host_star_type", "host_type",
            ],
            CanonicalField::PlanetRadiusEarth => &[
                "planet_radius_earth", "planet_radius", "pl_rade", "radius", "pl_radius",
                "r_planet", "planet_r", "radius_earth", "earth_radius", "r_earth", "re",
                "planet_size", "size", "pl_rad", "radius_e",
            ],
            CanonicalField::OrbitalPeriodDays => &[
                "orbital_period_days", "orbital_period", "period", "pl_orbper", "orbit_period",
                "period_days", "pl_period", "p", "orbit_p", "period_d", "days",
            ],
            CanonicalField::StellarMassSolar => &[
                "stellar_mass_solar", "stellar_mass", "star_mass", "st_mass", "host_mass",
                "host_star_mass", "m_star", "mass_star", "stellar_m", "st_m", "ms",
                "mass_stellar", "host_m",
            ],
            CanonicalField::PlanetMassEarth => &[
                "planet_mass_earth", "planet_mass", "pl_masse", "pl_bmasse", "mass", "pl_mass",
                "m_planet", "planet_m", "mass_earth", "earth_mass", "m_earth", "me", "pl_m",
                "mass_e", "planet_masse",
            ],
            CanonicalField::TemperatureK => &[
                "temperature_k", "temperature", "temp", "pl_eqt", "equilibrium_temperature",
                "eq_temp", "teq", "t_eq", "planet_temp", "pl_temp", "temp_eq", "kelvin",
            ],
            CanonicalField::DiscoveryYear => &[
                "discovery_year", "disc_year", "year", "discovery_date", "found_year",
                "detected_year", "publication_year", "announce_year", "year_discovered", "yr",
            ],
            CanonicalField::DetectionMethod => &[
                "detection_method", "discovery_method", "method", "discoverymethod",
                "detection_technique", "discovery_technique", "technique", "method_detection",
                "detect_method", "disc_method",
            ],
            CanonicalField::DataQuality => &[
                "data_quality", "quality", "data_flag", "flag", "reliability", "confidence",
                "quality_flag", "grade", "rating", "status", "validation_status", "verified",
            ],
            CanonicalField::SemiMajorAxisAu => &[
                "semi_major_axis_au", "semi_major_axis", "pl_orbsmax", "orbital_distance", "sma",
                "a_au", "orbit_au",
            ],
            CanonicalField::Eccentricity => &[
                "eccentricity", "pl_orbeccen", "ecc", "orbital_eccentricity", "e",
            ],
            CanonicalField::StellarTemperatureK => &[
                "stellar_temperature_k", "st_teff", "stellar_temperature", "star_temperature",
                "teff", "t_eff", "effective_temperature", "host_teff", "stellar_teff",
            ],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CanonicalField::Name => "Planet or target identifier",
            CanonicalField::DistancePc => "Distance from the Sun",
            CanonicalField::StarType => "Host star spectral type (O, B, A, F, G, K, M)",
            CanonicalField::PlanetRadiusEarth => "Planet radius",
            CanonicalField::OrbitalPeriodDays => "Orbital period",
            CanonicalField::StellarMassSolar => "Host star mass (defaults to 1.0)",
            CanonicalField::PlanetMassEarth => "Planet mass (estimated from radius when absent)",
            CanonicalField::TemperatureK => "Planet equilibrium temperature",
            CanonicalField::DiscoveryYear => "Year of discovery",
            CanonicalField::DetectionMethod => "Discovery technique",
            CanonicalField::DataQuality => "Data quality grade (defaults to Good)",
            CanonicalField::SemiMajorAxisAu => "Orbital semi-major axis (stands in for the period)",
            CanonicalField::Eccentricity => "Orbital eccentricity",
            CanonicalField::StellarTemperatureK => "Host star effective temperature",
        }
    }

    pub fn unit(&self) -> Option<&'static str> {
        match self {
            CanonicalField::DistancePc => Some("parsecs"),
            CanonicalField::PlanetRadiusEarth => Some("Earth radii"),
            CanonicalField::OrbitalPeriodDays => Some("days"),
            CanonicalField::StellarMassSolar => Some("solar masses"),
            CanonicalField::PlanetMassEarth => Some("Earth masses"),
            CanonicalField::TemperatureK | CanonicalField::StellarTemperatureK => Some("K"),
            CanonicalField::SemiMajorAxisAu => Some("AU"),
            _ => None,
        }
    }

    pub fn examples(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Name => &["Kepler-442b", "Proxima Cen b", "TRAPPIST-1 e"],
            CanonicalField::DistancePc => &["370.0", "1.30", "12.4"],
            CanonicalField::StarType => &["K", "M5.5V", "G2V"],
            CanonicalField::PlanetRadiusEarth => &["1.34", "1.07", "0.92"],
            CanonicalField::OrbitalPeriodDays => &["112.3", "11.19", "6.1"],
            CanonicalField::StellarMassSolar => &["0.61", "0.12", "1.0"],
            CanonicalField::PlanetMassEarth => &["2.3", "1.07", "0.69"],
            CanonicalField::TemperatureK => &["233", "234", "251"],
            CanonicalField::DiscoveryYear => &["2015", "2016", "2017"],
            CanonicalField::DetectionMethod => &["Transit", "Radial Velocity", "Imaging"],
            CanonicalField::DataQuality => &["Excellent", "Good", "Limited"],
            CanonicalField::SemiMajorAxisAu => &["0.409", "0.0485", "0.029"],
            CanonicalField::Eccentricity => &["0.04", "0.02", "0.005"],
            CanonicalField::StellarTemperatureK => &["4402", "3042", "2566"],
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_aliases_unique_across_fields() {
        let mut seen = HashSet::new();
        for field in CanonicalField::ALL {
            for alias in field.aliases() {
                assert!(seen.insert(*alias), "alias '{}' listed twice", alias);
            }
        }
    }

    #[test]
    fn test_canonical_name_is_first_alias() {
        for field in CanonicalField::ALL {
            assert_eq!(field.aliases()[0], field.as_str());
        }
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        for field in CanonicalField::ALL {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, field.as_str());
        }
    }

    #[test]
    fn test_tiers() {
        assert_eq!(CanonicalField::Name.tier(), FieldTier::Required);
        assert_eq!(CanonicalField::StellarMassSolar.tier(), FieldTier::Defaulted);
        assert!(!CanonicalField::Eccentricity.counts_toward_quality());
        assert_eq!(
            CanonicalField::OrbitalPeriodDays.substitute(),
            Some(CanonicalField::SemiMajorAxisAu)
        );
    }
}
