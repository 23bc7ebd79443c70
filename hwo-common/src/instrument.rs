//! Instrument (telescope + coronagraph) parameters
//!
//! Parameters drive the observability model and are swept live from the UI,
//! so every value is range-checked before use. Out-of-range values are
//! rejected with the valid range spelled out rather than clamped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Telescope aperture diameter range in metres
pub const DIAMETER_RANGE_M: (f64, f64) = (1.0, 50.0);

/// Coronagraph inner working angle range in milliarcseconds
pub const IWA_RANGE_MAS: (f64, f64) = (1.0, 1000.0);

/// Planet/star contrast sensitivity floor range
pub const CONTRAST_SENSITIVITY_RANGE: (f64, f64) = (1e-12, 1e-6);

/// Observability margin threshold range
pub const THRESHOLD_RANGE: (f64, f64) = (0.0, 1.0);

/// Instrument parameter validation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstrumentParamError {
    /// Numeric parameter outside its valid range (NaN is always out of range)
    #[error("{parameter} = {value} is outside the valid range [{min}, {max}]")]
    OutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Wavelength band name not recognised
    #[error("unknown wavelength band '{0}' (expected one of UV, Visible, NIR)")]
    UnknownBand(String),
}

impl InstrumentParamError {
    /// Name of the offending parameter
    pub fn parameter(&self) -> &'static str {
        match self {
            InstrumentParamError::OutOfRange { parameter, .. } => parameter,
            InstrumentParamError::UnknownBand(_) => "wavelength_band",
        }
    }
}

/// Check `value` against an inclusive range
pub fn check_range(
    parameter: &'static str,
    value: f64,
    (min, max): (f64, f64),
) -> Result<f64, InstrumentParamError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(InstrumentParamError::OutOfRange {
            parameter,
            value,
            min,
            max,
        })
    }
}

/// Observing wavelength band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavelengthBand {
    #[serde(rename = "UV", alias = "uv")]
    Uv,
    #[serde(alias = "visible", alias = "VIS")]
    Visible,
    #[serde(rename = "NIR", alias = "nir")]
    Nir,
}

impl WavelengthBand {
    pub const ALL: [WavelengthBand; 3] = [WavelengthBand::Uv, WavelengthBand::Visible, WavelengthBand::Nir];

    /// Representative wavelength of the band in micrometres
    pub fn wavelength_um(&self) -> f64 {
        match self {
            WavelengthBand::Uv => 0.25,
            WavelengthBand::Visible => 0.55,
            WavelengthBand::Nir => 1.6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WavelengthBand::Uv => "UV",
            WavelengthBand::Visible => "Visible",
            WavelengthBand::Nir => "NIR",
        }
    }
}

impl fmt::Display for WavelengthBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WavelengthBand {
    type Err = InstrumentParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uv" => Ok(WavelengthBand::Uv),
            "visible" | "vis" => Ok(WavelengthBand::Visible),
            "nir" => Ok(WavelengthBand::Nir),
            _ => Err(InstrumentParamError::UnknownBand(s.to_string())),
        }
    }
}

/// Instrument parameter set
///
/// Immutable value type: a parameter sweep produces a new set per step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentParams {
    /// Primary mirror diameter in metres (default: 6.0)
    #[serde(default = "default_diameter_m", alias = "telescope_diameter_m")]
    pub diameter_m: f64,

    /// Observing band (default: Visible)
    #[serde(default = "default_band")]
    pub wavelength_band: WavelengthBand,

    /// Coronagraph inner working angle in mas (default: 75.0)
    #[serde(default = "default_iwa_mas", alias = "inner_working_angle_mas")]
    pub iwa_mas: f64,

    /// Faintest detectable planet/star contrast (default: 1e-10)
    #[serde(default = "default_contrast_sensitivity")]
    pub contrast_sensitivity: f64,
}

fn default_diameter_m() -> f64 {
    6.0
}

fn default_band() -> WavelengthBand {
    WavelengthBand::Visible
}

fn default_iwa_mas() -> f64 {
    75.0
}

fn default_contrast_sensitivity() -> f64 {
    1e-10
}

impl Default for InstrumentParams {
    fn default() -> Self {
        Self {
            diameter_m: default_diameter_m(),
            wavelength_band: default_band(),
            iwa_mas: default_iwa_mas(),
            contrast_sensitivity: default_contrast_sensitivity(),
        }
    }
}

impl InstrumentParams {
    /// Validate every numeric parameter against its documented range
    pub fn validate(&self) -> Result<(), InstrumentParamError> {
        check_range("diameter_m", self.diameter_m, DIAMETER_RANGE_M)?;
        check_range("iwa_mas", self.iwa_mas, IWA_RANGE_MAS)?;
        check_range(
            "contrast_sensitivity",
            self.contrast_sensitivity,
            CONTRAST_SENSITIVITY_RANGE,
        )?;
        Ok(())
    }

    /// Validate and return self, for use in builder-style chains
    pub fn validated(self) -> Result<Self, InstrumentParamError> {
        self.validate()?;
        Ok(self)
    }
}

/// Validate an observability margin threshold
pub fn validate_threshold(threshold: f64) -> Result<f64, InstrumentParamError> {
    check_range("threshold", threshold, THRESHOLD_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(InstrumentParams::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_reports_bounds() {
        let params = InstrumentParams {
            diameter_m: 120.0,
            ..Default::default()
        };
        match params.validate() {
            Err(InstrumentParamError::OutOfRange { parameter, min, max, .. }) => {
                assert_eq!(parameter, "diameter_m");
                assert_eq!(min, 1.0);
                assert_eq!(max, 50.0);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_nan_rejected() {
        let params = InstrumentParams {
            iwa_mas: f64::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_band_parsing() {
        assert_eq!("visible".parse::<WavelengthBand>().unwrap(), WavelengthBand::Visible);
        assert_eq!(" NIR ".parse::<WavelengthBand>().unwrap(), WavelengthBand::Nir);
        assert!(matches!(
            "X-ray".parse::<WavelengthBand>(),
            Err(InstrumentParamError::UnknownBand(_))
        ));
    }

    #[test]
    fn test_serde_aliases() {
        let params: InstrumentParams = serde_json::from_str(
            r#"{"telescope_diameter_m": 8.0, "wavelength_band": "NIR", "inner_working_angle_mas": 60}"#,
        )
        .unwrap();
        assert_eq!(params.diameter_m, 8.0);
        assert_eq!(params.wavelength_band, WavelengthBand::Nir);
        assert_eq!(params.iwa_mas, 60.0);
        assert_eq!(params.contrast_sensitivity, 1e-10);
    }
}
