//! Configuration loading tests
//!
//! Tests that manipulate HWO_CONFIG are marked with #[serial] so they run
//! sequentially, not in parallel.

use hwo_common::config::{load_config, ConfigOverrides, TomlConfig, CONFIG_ENV_VAR};
use hwo_common::{Error, WavelengthBand};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

#[test]
fn test_empty_toml_uses_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.port, 5780);
    assert_eq!(config.scoring.ml_weight, 0.5);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 9000
        models_dir = "/opt/hwo/models"

        [scoring]
        ml_weight = 0.7

        [observability]
        diameter_m = 8.0
        wavelength_band = "NIR"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 9000);
    assert_eq!(config.models_dir, PathBuf::from("/opt/hwo/models"));
    assert_eq!(config.scoring.ml_weight, 0.7);
    assert_eq!(config.scoring.temperature_outer_min_k, 150.0);
    assert_eq!(config.observability.diameter_m, 8.0);
    assert_eq!(config.observability.wavelength_band, WavelengthBand::Nir);
    assert_eq!(config.observability.iwa_mas, 75.0);
    assert_eq!(config.bind_address, "127.0.0.1");
}

#[test]
fn test_invalid_ml_weight_rejected() {
    let err = TomlConfig::from_toml_str("[scoring]\nml_weight = 1.5\n").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_invalid_instrument_defaults_rejected() {
    let err = TomlConfig::from_toml_str("[observability]\ndiameter_m = 0.2\n").unwrap_err();
    assert!(matches!(err, Error::InstrumentParam(_)));
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_overrides_take_priority() {
    let config = TomlConfig::from_toml_str("port = 9000\nbind_address = \"0.0.0.0\"\n").unwrap();
    let overrides = ConfigOverrides {
        port: Some(7000),
        models_dir: Some(PathBuf::from("/tmp/models")),
        ..Default::default()
    };
    let config = config.with_overrides(&overrides);

    assert_eq!(config.port, 7000);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.models_dir, PathBuf::from("/tmp/models"));
    assert_eq!(config.listen_address(), "0.0.0.0:7000");
}

#[test]
#[serial]
fn test_explicit_path_loaded() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("port = 6100\n");

    let (config, source) = load_config(Some(file.path())).unwrap();
    assert_eq!(config.port, 6100);
    assert_eq!(source.as_deref(), Some(file.path()));
}

#[test]
#[serial]
fn test_env_var_path_loaded() {
    let file = write_config("port = 6200\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let result = load_config(None);
    env::remove_var(CONFIG_ENV_VAR);

    let (config, _) = result.unwrap();
    assert_eq!(config.port, 6200);
}

#[test]
#[serial]
fn test_missing_explicit_path_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let missing = PathBuf::from("/nonexistent/hwo/config.toml");
    assert!(matches!(load_config(Some(&missing)), Err(Error::Config(_))));
}
