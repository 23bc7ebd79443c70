//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`HWO_*`)
//! 3. TOML config file
//! 4. Built-in defaults (fallback)
//!
//! Command-line and environment values arrive together through clap's `env`
//! support and are applied with [`TomlConfig::with_overrides`].

use crate::instrument::InstrumentParams;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HWO_CONFIG";

/// Service configuration loaded from TOML
///
/// Every field has a default so an empty file (or no file) is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Interface to bind (default: 127.0.0.1)
    pub bind_address: String,

    /// HTTP port (default: 5780)
    pub port: u16,

    /// Directory holding model_metadata.json and ensemble artifacts
    pub models_dir: PathBuf,

    /// Optional CSV of reference targets for observability counts
    pub catalog_path: Option<PathBuf>,

    /// Maximum accepted CSV upload size in bytes (default: 10 MiB)
    pub max_upload_bytes: usize,

    /// CORS origins allowed to call the API (empty = permissive)
    pub allowed_origins: Vec<String>,

    pub logging: LoggingConfig,

    pub scoring: ScoringConfig,

    /// Instrument parameters used until a client publishes its own
    pub observability: InstrumentParams,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5780,
            models_dir: PathBuf::from("models"),
            catalog_path: None,
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_origins: Vec::new(),
            logging: LoggingConfig::default(),
            scoring: ScoringConfig::default(),
            observability: InstrumentParams::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Scoring knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the ML regression score in the blended habitability score;
    /// the CDHS composite receives `1 - ml_weight` (default: 0.5)
    pub ml_weight: f64,

    /// Temperature at which the temperature factor reaches zero (cold side)
    pub temperature_outer_min_k: f64,

    /// Temperature at which the temperature factor reaches zero (hot side)
    pub temperature_outer_max_k: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ml_weight: 0.5,
            temperature_outer_min_k: 150.0,
            temperature_outer_max_k: 450.0,
        }
    }
}

impl ScoringConfig {
    /// Reject weights outside [0, 1] and outer bounds that cut into the
    /// 273-373 K plateau
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ml_weight) {
            return Err(Error::Config(format!(
                "scoring.ml_weight must be within [0, 1], got {}",
                self.ml_weight
            )));
        }
        if !(self.temperature_outer_min_k < 273.0 && self.temperature_outer_max_k > 373.0) {
            return Err(Error::Config(format!(
                "scoring temperature bounds must enclose 273-373 K, got {}-{}",
                self.temperature_outer_min_k, self.temperature_outer_max_k
            )));
        }
        Ok(())
    }
}

/// Values supplied on the command line or through `HWO_*` variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub models_dir: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Validate nested sections
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Apply command-line/environment overrides on top of file values
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(bind) = &overrides.bind_address {
            self.bind_address = bind.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(dir) = &overrides.models_dir {
            self.models_dir = dir.clone();
        }
        if let Some(path) = &overrides.catalog_path {
            self.catalog_path = Some(path.clone());
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        self
    }

    /// Socket address string for the HTTP listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Default config file location (`<config dir>/hwo/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hwo").join("config.toml"))
}

/// Resolve and load configuration
///
/// An explicitly named file (argument or `HWO_CONFIG`) must exist. The
/// default location is optional: when absent, built-in defaults are used.
/// Returns the config and the file it came from, if any.
pub fn load_config(explicit: Option<&Path>) -> Result<(TomlConfig, Option<PathBuf>)> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = TomlConfig::load(&path)?;
        info!("Loaded configuration from {}", path.display());
        return Ok((config, Some(path)));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let config = TomlConfig::load(&path)?;
            info!("Loaded configuration from {}", path.display());
            Ok((config, Some(path)))
        }
        _ => {
            warn!("No config file found, using built-in defaults");
            Ok((TomlConfig::default(), None))
        }
    }
}
