//! Failure-mode distribution per IEC 61709.
//!
//! A component's derated failure rate is split across its class's failure
//! modes by fixed fractions. Each mode carries an ISO 26262 fault
//! classification that decides which fault bucket its FIT lands in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fmeda::component::ComponentClass;
use crate::fmeda::error::{FmedaError, FmedaResult};
use crate::fmeda::library::ComponentLibrary;

/// Tolerance on the sum of a class's mode fractions.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// ISO 26262 classification of a failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultClass {
    /// Does not violate a safety goal.
    Safe,
    /// Violates a safety goal directly; no redundancy.
    #[default]
    SinglePoint,
    /// Single-point fault partly covered by a safety mechanism.
    Residual,
    /// Multi-point fault that stays hidden until a second fault occurs.
    LatentMultiPoint,
    /// Multi-point fault that is detected or perceived.
    DetectedMultiPoint,
    /// Violates a safety goal only together with one other fault.
    DualPoint,
}

impl FaultClass {
    /// Parses a classification from a string.
    ///
    /// Accepts the snake-case names plus the usual abbreviations
    /// (`SF`, `SPF`, `RF`, `MPF_L`, `MPF_D`, `DPF`), case-insensitive.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        match key.as_str() {
            "safe" | "sf" => Some(Self::Safe),
            "single_point" | "spf" => Some(Self::SinglePoint),
            "residual" | "rf" => Some(Self::Residual),
            "latent_multi_point" | "latent" | "mpf_l" => Some(Self::LatentMultiPoint),
            "detected_multi_point" | "detected" | "mpf_d" => Some(Self::DetectedMultiPoint),
            "dual_point" | "dpf" => Some(Self::DualPoint),
            _ => None,
        }
    }
}

impl fmt::Display for FaultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Safe => "safe",
            Self::SinglePoint => "single_point",
            Self::Residual => "residual",
            Self::LatentMultiPoint => "latent_multi_point",
            Self::DetectedMultiPoint => "detected_multi_point",
            Self::DualPoint => "dual_point",
        };
        f.write_str(name)
    }
}

impl FromStr for FaultClass {
    type Err = FmedaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| {
            FmedaError::invalid_input("classification", format!("'{s}' is not a fault class"))
        })
    }
}

/// A named failure mode of a component class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureMode {
    /// Mode name, e.g. "Open Circuit".
    pub name: String,

    /// Share of the class's FIT attributed to this mode.
    pub fraction: f64,

    /// ISO 26262 classification. Defaults to single-point.
    #[serde(default)]
    pub classification: FaultClass,
}

impl FailureMode {
    /// Creates a single-point failure mode.
    #[must_use]
    pub fn new(name: impl Into<String>, fraction: f64) -> Self {
        Self {
            name: name.into(),
            fraction,
            classification: FaultClass::SinglePoint,
        }
    }

    /// Sets the classification.
    #[must_use]
    pub const fn classified(mut self, classification: FaultClass) -> Self {
        self.classification = classification;
        self
    }
}

/// Checks a mode table: non-empty, unique names, fractions in [0, 1]
/// summing to 1.0 within `tolerance`.
///
/// # Errors
///
/// Returns [`FmedaError::InvalidLibrary`] describing the first violation.
pub fn validate_modes(class: ComponentClass, modes: &[FailureMode], tolerance: f64) -> FmedaResult<()> {
    if modes.is_empty() {
        return Err(FmedaError::invalid_library(format!(
            "'{class}' has no failure modes"
        )));
    }

    for (index, mode) in modes.iter().enumerate() {
        if !mode.fraction.is_finite() || !(0.0..=1.0).contains(&mode.fraction) {
            return Err(FmedaError::invalid_library(format!(
                "'{class}' mode '{}' has fraction {} outside [0, 1]",
                mode.name, mode.fraction
            )));
        }
        if modes[..index]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&mode.name))
        {
            return Err(FmedaError::invalid_library(format!(
                "'{class}' lists mode '{}' twice",
                mode.name
            )));
        }
    }

    let total: f64 = modes.iter().map(|m| m.fraction).sum();
    if (total - 1.0).abs() > tolerance {
        return Err(FmedaError::invalid_library(format!(
            "'{class}' mode fractions sum to {total:.6}, expected 1.0 (tolerance {tolerance})"
        )));
    }
    Ok(())
}

/// FIT attributed to one failure mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeContribution<'a> {
    /// The failure mode.
    pub mode: &'a FailureMode,
    /// FIT share of this mode.
    pub fit: f64,
}

/// Ordered per-mode FIT split of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeDistribution<'a> {
    /// Component class the table was taken from.
    pub class: ComponentClass,
    /// One entry per mode, in table order.
    pub contributions: Vec<ModeContribution<'a>>,
}

impl<'a> ModeDistribution<'a> {
    /// Sum of all contributions.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.contributions.iter().map(|c| c.fit).sum()
    }

    /// FIT of the named mode (case-insensitive), if present.
    #[must_use]
    pub fn get(&self, mode: &str) -> Option<f64> {
        self.contributions
            .iter()
            .find(|c| c.mode.name.eq_ignore_ascii_case(mode))
            .map(|c| c.fit)
    }

    /// Iterates over the contributions.
    pub fn iter(&self) -> std::slice::Iter<'_, ModeContribution<'a>> {
        self.contributions.iter()
    }
}

/// Splits failure rates across modes using a component library.
#[derive(Debug, Clone, Copy)]
pub struct FailureModeDistributor<'a> {
    library: &'a ComponentLibrary,
}

impl<'a> FailureModeDistributor<'a> {
    /// Creates a distributor over `library`.
    #[must_use]
    pub const fn new(library: &'a ComponentLibrary) -> Self {
        Self { library }
    }

    /// Splits `fit` across the failure modes of `class`.
    ///
    /// The library normalises fractions at load time, so the contributions
    /// sum to `fit` within floating-point tolerance.
    ///
    /// # Errors
    ///
    /// - [`FmedaError::UnknownComponentClass`] if the library has no table
    ///   for `class`
    /// - [`FmedaError::InvalidInput`] if `fit` is negative or not finite
    pub fn distribute(&self, fit: f64, class: ComponentClass) -> FmedaResult<ModeDistribution<'a>> {
        if !fit.is_finite() || fit < 0.0 {
            return Err(FmedaError::invalid_input(
                "fit",
                format!("{fit} is not a non-negative failure rate"),
            ));
        }

        let profile = self.library.profile(class)?;
        let contributions = profile
            .modes
            .iter()
            .map(|mode| ModeContribution {
                mode,
                fit: fit * mode.fraction,
            })
            .collect();

        Ok(ModeDistribution {
            class,
            contributions,
        })
    }
}
