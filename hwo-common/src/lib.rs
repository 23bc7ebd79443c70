//! # HWO Common Library
//!
//! Shared code for the HWO habitability services:
//! - Error type shared by all crates
//! - Configuration loading (TOML + environment + command line)
//! - Instrument parameters and their valid ranges
//! - Event types and the broadcast `EventBus`
//! - SSE stream helpers

pub mod config;
pub mod error;
pub mod events;
pub mod instrument;
pub mod sse;

pub use error::{Error, Result};
pub use instrument::{InstrumentParamError, InstrumentParams, WavelengthBand};
