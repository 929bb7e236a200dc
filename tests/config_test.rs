use std::path::Path;

use market_profile::config::{default_session_windows, AnalysisConfig, ConfigError};

#[test]
fn test_shipped_config_matches_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml");
    let config = AnalysisConfig::from_toml(&path).expect("shipped config.toml should load");
    let defaults = AnalysisConfig::default();

    assert_eq!(config.profile, defaults.profile);
    assert_eq!(config.revisit, defaults.revisit);
    assert_eq!(config.sessions, default_session_windows());
    assert_eq!(config.tolerance(), 0.5);
}

#[test]
fn test_invalid_config_is_rejected_before_processing() {
    let result = AnalysisConfig::from_toml_str("[profile]\nprice_step = -1.0\n");
    assert!(matches!(result, Err(ConfigError::InvalidPriceStep(_))));

    let result = AnalysisConfig::from_toml_str("[revisit]\ntolerance = -0.1\n");
    assert!(matches!(result, Err(ConfigError::NegativeValue { name: "tolerance", .. })));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = AnalysisConfig::from_toml("does/not/exist.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
