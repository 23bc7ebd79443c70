//! Common error types for HWO services

use thiserror::Error;

use crate::instrument::InstrumentParamError;

/// Common result type for HWO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across HWO services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Telescope/instrument parameter outside its valid range
    #[error("Invalid instrument parameter: {0}")]
    InstrumentParam(#[from] InstrumentParamError),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Parse TOML failed: {}", err))
    }
}
