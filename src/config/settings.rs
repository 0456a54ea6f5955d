//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::fmeda::asil::{Asil, AsilThresholds, Threshold};
use crate::fmeda::fit::DEFAULT_REFERENCE_TEMPERATURE_C;
use crate::fmeda::metrics::MetricBasis;
use crate::fmeda::pipeline::AnalysisSettings;
use crate::fmeda::report::DEFAULT_PRECISION;

/// Largest accepted number of decimals in percentage strings.
const MAX_PRECISION: usize = 10;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// ASIL target overrides, merged over the ISO 26262 defaults.
    #[serde(default)]
    pub thresholds: IndexMap<Asil, Threshold>,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t_ref = self.analysis.reference_temperature_c;
        if !t_ref.is_finite() || t_ref <= -273.15 {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid reference temperature {t_ref} °C. Must be above absolute zero"
                ),
            });
        }

        self.thresholds()
            .validate()
            .map_err(|e| ConfigError::ValidationError {
                message: e.to_string(),
            })?;

        if self.report.precision > MAX_PRECISION {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid report precision {}. Must be at most {MAX_PRECISION}",
                    self.report.precision
                ),
            });
        }
        Ok(())
    }

    /// ISO 26262 targets with the configured overrides applied.
    #[must_use]
    pub fn thresholds(&self) -> AsilThresholds {
        AsilThresholds::iso26262().with_overrides(&self.thresholds)
    }

    /// Builds the pipeline settings.
    #[must_use]
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            reference_temperature_c: self.analysis.reference_temperature_c,
            default_target_asil: self.analysis.default_target_asil,
            metric_basis: self.analysis.metric_basis,
            parallel: self.analysis.parallel,
            thresholds: self.thresholds(),
            precision: self.report.precision,
        }
    }
}

/// Analysis configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Reference temperature of library FIT values in °C.
    /// Default: 40
    #[serde(default = "default_reference_temperature")]
    pub reference_temperature_c: f64,

    /// Target ASIL for sheets without their own.
    /// Default: "D"
    #[serde(default)]
    pub default_target_asil: Asil,

    /// Metric denominators: "total_fit" or "safety_related".
    #[serde(default)]
    pub metric_basis: MetricBasis,

    /// Analyse sheets in parallel.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_temperature_c: default_reference_temperature(),
            default_target_asil: Asil::default(),
            metric_basis: MetricBasis::default(),
            parallel: default_true(),
        }
    }
}

const fn default_reference_temperature() -> f64 {
    DEFAULT_REFERENCE_TEMPERATURE_C
}

const fn default_true() -> bool {
    true
}

/// Report configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Decimals in percentage strings.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
        }
    }
}

const fn default_precision() -> usize {
    DEFAULT_PRECISION
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
