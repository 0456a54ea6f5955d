//! Analysis configuration.
//!
//! A JSON file that tunes the calculation and the report. Every section and
//! field is optional; omitted values take the defaults below.
//!
//! | Section      | Field                     | Default                 |
//! |--------------|---------------------------|-------------------------|
//! | `analysis`   | `reference_temperature_c` | 40 °C                   |
//! | `analysis`   | `default_target_asil`     | `D`                     |
//! | `analysis`   | `metric_basis`            | `total_fit`             |
//! | `analysis`   | `parallel`                | `true`                  |
//! | `thresholds` | `B` / `C` / `D` / ...     | ISO 26262-5 SPFM/LFM    |
//! | `report`     | `precision`               | 2 decimals              |
//! | `logging`    | `level`                   | `warn`                  |
//!
//! Threshold entries replace the built-in SPFM/LFM targets of the ASILs they
//! name and leave the others untouched.
//!
//! The file is read from the `--config` path, or else from
//! `~/.fmeda-calc/config.json` (`%USERPROFILE%\.fmeda-calc\config.json` on
//! Windows). A missing file at the default location means defaults.
//!
//! See `config/example-config.json` for a complete example.

mod settings;

pub use settings::{AnalysisConfig, Config, LoggingConfig, ReportConfig};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.fmeda-calc/`
/// - **Windows:** `%USERPROFILE%\.fmeda-calc\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".fmeda-calc"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Required fields are missing or invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path().ok_or_else(|| ConfigError::NotFound {
            path: PathBuf::from("<default config path>"),
        })?,
    };

    if !config_path.exists() {
        return Err(ConfigError::NotFound { path: config_path });
    }

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;
    tracing::debug!(
        path = %config_path.display(),
        basis = ?config.analysis.metric_basis,
        overrides = config.thresholds.len(),
        "Loaded configuration"
    );

    Ok(config)
}

/// Loads the configuration, falling back to defaults when no file exists at
/// the default location.
///
/// An explicit `path` that does not exist is still an error.
///
/// # Errors
///
/// Returns any error from [`load_config`] other than a missing default file.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match load_config(path) {
        Err(ConfigError::NotFound { path: missing }) if path.is_none() => {
            tracing::debug!(path = %missing.display(), "No configuration file, using defaults");
            Ok(Config::default())
        }
        other => other,
    }
}
