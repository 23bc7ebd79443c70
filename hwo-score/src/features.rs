//! Feature derivation
//!
//! Builds the fixed-order numeric vector shared by the CDHS scorer and the
//! ML models. Every feature records whether it was measured, derived from
//! measured inputs, or estimated (defaulted, imputed, or derived from an
//! estimate).

use serde::Serialize;

use crate::mapping::CanonicalField;
use crate::normalize::CanonicalTarget;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "distance_pc",
    "planet_radius_earth",
    "planet_mass_earth",
    "orbital_period_days",
    "semi_major_axis_au",
    "equilibrium_temp_k",
    "stellar_mass_solar",
    "stellar_luminosity_solar",
    "planet_density_earth",
    "hz_inner_au",
    "hz_outer_au",
    "hz_center_au",
    "hz_distance_ratio",
    "star_type_code",
    "discovery_year",
    "detection_method_code",
    "data_quality_code",
    "insolation_earth",
];

pub const FEATURE_COUNT: usize = 18;

/// Discovery year assumed when none is given
const DEFAULT_DISCOVERY_YEAR: f64 = 2020.0;

/// Rocky/gaseous split of the mass-radius relation (Earth radii)
const ROCKY_RADIUS_LIMIT: f64 = 1.5;

/// Index of each feature in [`FEATURE_NAMES`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Feature {
    DistancePc,
    PlanetRadiusEarth,
    PlanetMassEarth,
    OrbitalPeriodDays,
    SemiMajorAxisAu,
    EquilibriumTempK,
    StellarMassSolar,
    StellarLuminositySolar,
    PlanetDensityEarth,
    HzInnerAu,
    HzOuterAu,
    HzCenterAu,
    HzDistanceRatio,
    StarTypeCode,
    DiscoveryYear,
    DetectionMethodCode,
    DataQualityCode,
    InsolationEarth,
}

impl Feature {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }
}

/// Position of a feature name, if known
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

/// Where a feature value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Measured,
    Derived,
    Estimated,
}

impl Provenance {
    fn from_input(estimated: bool) -> Self {
        if estimated {
            Provenance::Estimated
        } else {
            Provenance::Measured
        }
    }

    /// Provenance of a value computed from `inputs`
    fn derived(inputs: &[Provenance]) -> Self {
        if inputs.contains(&Provenance::Estimated) {
            Provenance::Estimated
        } else {
            Provenance::Derived
        }
    }
}

/// Spectral class encoding (O 0.1 .. M 1.0; unknown 0.5)
pub fn encode_star_type(star_type: &str) -> Option<f64> {
    let class = star_type.trim().chars().next()?.to_ascii_uppercase();
    match class {
        'O' => Some(0.1),
        'B' => Some(0.2),
        'A' => Some(0.3),
        'F' => Some(0.5),
        'G' => Some(0.8),
        'K' => Some(0.9),
        'M' => Some(1.0),
        _ => None,
    }
}

/// Detection technique encoding; unknown techniques are `None`
pub fn encode_detection_method(method: &str) -> Option<f64> {
    let method = method.to_ascii_lowercase();
    if method.contains("transit") {
        Some(1.0)
    } else if method.contains("radial") || method.contains("velocity") {
        Some(0.8)
    } else if method.contains("imaging") {
        Some(0.6)
    } else if method.contains("microlensing") {
        Some(0.4)
    } else {
        None
    }
}

/// Data quality grade encoding; unknown grades are `None`
pub fn encode_data_quality(quality: &str) -> Option<f64> {
    match quality.trim().to_ascii_lowercase().as_str() {
        "excellent" => Some(1.0),
        "good" => Some(0.8),
        "fair" => Some(0.6),
        "limited" | "poor" => Some(0.4),
        _ => None,
    }
}

/// Planet mass from radius (Earth units)
pub fn mass_from_radius(radius_earth: f64) -> f64 {
    if radius_earth <= ROCKY_RADIUS_LIMIT {
        radius_earth.powf(3.7)
    } else {
        radius_earth.powf(1.8)
    }
}

/// Immutable feature vector for one target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
    provenance: [Provenance; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_target(target: &CanonicalTarget) -> Self {
        let est = |field: CanonicalField| Provenance::from_input(target.is_estimated(field));

        let mass_star = target.stellar_mass_solar;
        let p_mass_star = est(CanonicalField::StellarMassSolar);
        let p_period = est(CanonicalField::OrbitalPeriodDays);

        let (semi_major_axis, p_sma) = match target.semi_major_axis_au {
            Some(a) => (a, Provenance::Measured),
            None => {
                let period_years = target.orbital_period_days / 365.25;
                (
                    (period_years.powi(2) * mass_star).cbrt(),
                    Provenance::derived(&[p_period, p_mass_star]),
                )
            }
        };

        let luminosity = mass_star.powf(3.5);
        let p_lum = Provenance::derived(&[p_mass_star]);

        let (planet_mass, p_planet_mass) = match target.planet_mass_earth {
            Some(m) => (m, Provenance::Measured),
            None => (mass_from_radius(target.planet_radius_earth), Provenance::Estimated),
        };

        let insolation = luminosity / semi_major_axis.powi(2);
        let p_insolation = Provenance::derived(&[p_lum, p_sma]);

        let (eq_temp, p_eq_temp) = match target.temperature_k {
            Some(t) => (t, Provenance::Measured),
            None => (278.0 * insolation.powf(0.25), Provenance::derived(&[p_insolation])),
        };

        let density = planet_mass / target.planet_radius_earth.powi(3);
        let hz_inner = 0.95 * luminosity.sqrt();
        let hz_outer = 1.37 * luminosity.sqrt();
        let hz_center = (hz_inner + hz_outer) / 2.0;
        let hz_ratio = semi_major_axis / hz_center;

        let (star_code, p_star) = match encode_star_type(&target.star_type) {
            Some(code) => (code, Provenance::Measured),
            None => (0.5, Provenance::Estimated),
        };
        let (year, p_year) = match target.discovery_year {
            Some(y) => (f64::from(y), Provenance::Measured),
            None => (DEFAULT_DISCOVERY_YEAR, Provenance::Estimated),
        };
        let (method_code, p_method) = match target.detection_method.as_deref().and_then(encode_detection_method) {
            Some(code) => (code, Provenance::Measured),
            None => (0.5, Provenance::Estimated),
        };
        let (quality_code, p_quality) = match encode_data_quality(&target.data_quality) {
            Some(code) => (code, est(CanonicalField::DataQuality)),
            None => (0.6, Provenance::Estimated),
        };

        let values = [
            target.distance_pc,
            target.planet_radius_earth,
            planet_mass,
            target.orbital_period_days,
            semi_major_axis,
            eq_temp,
            mass_star,
            luminosity,
            density,
            hz_inner,
            hz_outer,
            hz_center,
            hz_ratio,
            star_code,
            year,
            method_code,
            quality_code,
            insolation,
        ];
        let provenance = [
            Provenance::Measured,
            Provenance::Measured,
            p_planet_mass,
            p_period,
            p_sma,
            p_eq_temp,
            p_mass_star,
            p_lum,
            Provenance::derived(&[p_planet_mass]),
            p_lum,
            p_lum,
            p_lum,
            Provenance::derived(&[p_sma, p_lum]),
            p_star,
            p_year,
            p_method,
            p_quality,
            p_insolation,
        ];

        Self { values, provenance }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn provenance(&self, feature: Feature) -> Provenance {
        self.provenance[feature.index()]
    }

    /// Values in [`FEATURE_NAMES`] order
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Names of estimated features, in feature order
    pub fn estimated_features(&self) -> Vec<&'static str> {
        FEATURE_NAMES
            .iter()
            .zip(self.provenance.iter())
            .filter(|(_, p)| **p == Provenance::Estimated)
            .map(|(name, _)| *name)
            .collect()
    }

    /// Share of features that are not estimated
    pub fn completeness(&self) -> f64 {
        let known = self
            .provenance
            .iter()
            .filter(|p| **p != Provenance::Estimated)
            .count();
        known as f64 / FEATURE_COUNT as f64
    }

    /// Values picked by feature index, in the order a model expects
    pub fn ordered(&self, indices: &[usize]) -> Vec<f64> {
        indices.iter().map(|i| self.values[*i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sun_earth() -> CanonicalTarget {
        CanonicalTarget {
            name: "Earth analog".to_string(),
            distance_pc: 10.0,
            star_type: "G2V".to_string(),
            planet_radius_earth: 1.0,
            orbital_period_days: 365.25,
            stellar_mass_solar: 1.0,
            planet_mass_earth: Some(1.0),
            temperature_k: None,
            discovery_year: Some(2021),
            detection_method: Some("Transit".to_string()),
            data_quality: "Excellent".to_string(),
            semi_major_axis_au: None,
            eccentricity: Some(0.0167),
            stellar_temperature_k: Some(5778.0),
            estimated: BTreeSet::new(),
        }
    }

    #[test]
    fn test_feature_names_cover_enum() {
        assert_eq!(Feature::InsolationEarth.index(), FEATURE_COUNT - 1);
        assert_eq!(Feature::HzDistanceRatio.name(), "hz_distance_ratio");
        assert_eq!(feature_index("insolation_earth"), Some(17));
        assert_eq!(feature_index("pl_rade"), None);
    }

    #[test]
    fn test_earth_analog_values() {
        let features = FeatureVector::from_target(&sun_earth());
        assert!((features.get(Feature::SemiMajorAxisAu) - 1.0).abs() < 1e-9);
        assert!((features.get(Feature::StellarLuminositySolar) - 1.0).abs() < 1e-12);
        assert!((features.get(Feature::EquilibriumTempK) - 278.0).abs() < 1e-6);
        assert!((features.get(Feature::InsolationEarth) - 1.0).abs() < 1e-9);
        assert!((features.get(Feature::HzCenterAu) - 1.16).abs() < 1e-9);
        assert_eq!(features.get(Feature::StarTypeCode), 0.8);
        assert_eq!(features.get(Feature::DetectionMethodCode), 1.0);
        assert_eq!(features.get(Feature::DataQualityCode), 1.0);
    }

    #[test]
    fn test_provenance_tracking() {
        let features = FeatureVector::from_target(&sun_earth());
        assert_eq!(features.provenance(Feature::DistancePc), Provenance::Measured);
        assert_eq!(features.provenance(Feature::SemiMajorAxisAu), Provenance::Derived);
        assert!(features.estimated_features().is_empty());
        assert_eq!(features.completeness(), 1.0);

        let mut target = sun_earth();
        target.planet_mass_earth = None;
        target.estimated.insert(CanonicalField::StellarMassSolar);
        let features = FeatureVector::from_target(&target);
        let estimated = features.estimated_features();
        assert!(estimated.contains(&"planet_mass_earth"));
        assert!(estimated.contains(&"stellar_luminosity_solar"));
        assert!(estimated.contains(&"equilibrium_temp_k"));
        assert!(features.completeness() < 1.0);
    }

    #[test]
    fn test_encodings() {
        assert_eq!(encode_star_type("m5.5V"), Some(1.0));
        assert_eq!(encode_star_type("K"), Some(0.9));
        assert_eq!(encode_star_type("?"), None);
        assert_eq!(encode_detection_method("Radial Velocity"), Some(0.8));
        assert_eq!(encode_detection_method("Astrometry"), None);
        assert_eq!(encode_data_quality("Limited"), Some(0.4));
        assert_eq!(encode_data_quality("so-so"), None);
    }

    #[test]
    fn test_mass_radius_relation() {
        assert!((mass_from_radius(1.0) - 1.0).abs() < 1e-12);
        assert!(mass_from_radius(2.0) < 2.0f64.powf(3.7));
    }
}
