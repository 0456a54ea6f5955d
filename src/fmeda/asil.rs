//! ASIL levels and architectural-metric targets per ISO 26262-5.
//!
//! ISO 26262-5:2018 Tables 4 and 5 give the hardware architectural metric
//! targets. ASIL A and QM carry no SPFM/LFM requirement.
//!
//! | ASIL | SPFM  | LFM   |
//! |------|-------|-------|
//! | B    | ≥ 90% | ≥ 60% |
//! | C    | ≥ 97% | ≥ 80% |
//! | D    | ≥ 99% | ≥ 90% |

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::fmeda::error::FmedaError;
use crate::fmeda::metrics::{MetricValue, Verdict};

/// Automotive Safety Integrity Level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Asil {
    /// Quality management, no safety requirement.
    Qm,
    /// ASIL A.
    A,
    /// ASIL B.
    B,
    /// ASIL C.
    C,
    /// ASIL D, the most stringent level.
    #[default]
    D,
}

impl Asil {
    /// All levels, least to most stringent.
    pub const ALL: [Self; 5] = [Self::Qm, Self::A, Self::B, Self::C, Self::D];

    /// Parses a level from a string.
    ///
    /// Accepts "D", "ASIL D", "asil_d", "ASIL-D", "QM" (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        let level = upper
            .strip_prefix("ASIL")
            .map_or(upper.as_str(), |rest| rest.trim_start_matches([' ', '_', '-']));
        match level {
            "QM" => Some(Self::Qm),
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }
}

impl fmt::Display for Asil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qm => write!(f, "QM"),
            Self::A => write!(f, "ASIL A"),
            Self::B => write!(f, "ASIL B"),
            Self::C => write!(f, "ASIL C"),
            Self::D => write!(f, "ASIL D"),
        }
    }
}

impl FromStr for Asil {
    type Err = FmedaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| {
            FmedaError::invalid_input("target_asil", format!("'{s}' is not an ASIL (QM, A-D)"))
        })
    }
}

impl TryFrom<String> for Asil {
    type Error = FmedaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Asil> for String {
    fn from(value: Asil) -> Self {
        value.to_string()
    }
}

/// SPFM and LFM targets for one ASIL, as fractions in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Threshold {
    /// Minimum single-point fault metric.
    pub spfm: f64,
    /// Minimum latent fault metric.
    pub lfm: f64,
}

impl Threshold {
    /// Creates a new threshold.
    #[must_use]
    pub const fn new(spfm: f64, lfm: f64) -> Self {
        Self { spfm, lfm }
    }
}

/// Threshold table keyed by target ASIL.
///
/// Levels absent from the table place no requirement on either metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsilThresholds {
    table: IndexMap<Asil, Threshold>,
}

impl Default for AsilThresholds {
    fn default() -> Self {
        Self::iso26262()
    }
}

impl AsilThresholds {
    /// Returns the ISO 26262-5 targets for ASIL B, C and D.
    #[must_use]
    pub fn iso26262() -> Self {
        let table = [
            (Asil::B, Threshold::new(0.90, 0.60)),
            (Asil::C, Threshold::new(0.97, 0.80)),
            (Asil::D, Threshold::new(0.99, 0.90)),
        ]
        .into_iter()
        .collect();
        Self { table }
    }

    /// Replaces or adds entries, keeping the table ordered by level.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &IndexMap<Asil, Threshold>) -> Self {
        for (asil, threshold) in overrides {
            self.table.insert(*asil, *threshold);
        }
        self.table.sort_keys();
        self
    }

    /// Returns the threshold for a level, if one is defined.
    #[must_use]
    pub fn get(&self, asil: Asil) -> Option<&Threshold> {
        self.table.get(&asil)
    }

    /// Iterates over the table in level order.
    pub fn iter(&self) -> impl Iterator<Item = (&Asil, &Threshold)> {
        self.table.iter()
    }

    /// Checks that every target is a fraction in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::InvalidInput`] naming the first bad entry.
    pub fn validate(&self) -> Result<(), FmedaError> {
        for (asil, threshold) in &self.table {
            for (metric, value) in [("spfm", threshold.spfm), ("lfm", threshold.lfm)] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(FmedaError::invalid_input(
                        format!("thresholds.{asil}.{metric}"),
                        format!("{value} is not a fraction in [0, 1]"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Compares metric values against the targets for `asil`.
    ///
    /// Values are compared unrounded. A metric that is not applicable does
    /// not contribute to the verdict.
    #[must_use]
    pub fn verdict(&self, asil: Asil, spfm: MetricValue, lfm: MetricValue) -> Verdict {
        if spfm.is_not_applicable() && lfm.is_not_applicable() {
            return Verdict::NotApplicable;
        }

        let Some(threshold) = self.get(asil) else {
            return Verdict::Pass;
        };

        let spfm_ok = spfm.value().map_or(true, |v| v >= threshold.spfm);
        let lfm_ok = lfm.value().map_or(true, |v| v >= threshold.lfm);

        match (spfm_ok, lfm_ok) {
            (true, true) => Verdict::Pass,
            (false, true) => Verdict::FailSpfm,
            (true, false) => Verdict::FailLfm,
            (false, false) => Verdict::FailBoth,
        }
    }

    /// Pass flag for every level in the table.
    #[must_use]
    pub fn compliance(&self, spfm: MetricValue, lfm: MetricValue) -> IndexMap<Asil, bool> {
        self.table
            .keys()
            .map(|asil| (*asil, self.verdict(*asil, spfm, lfm) == Verdict::Pass))
            .collect()
    }

    /// Highest level in the table whose targets are met.
    #[must_use]
    pub fn highest_met(&self, spfm: MetricValue, lfm: MetricValue) -> Option<Asil> {
        self.compliance(spfm, lfm)
            .into_iter()
            .filter_map(|(asil, pass)| pass.then_some(asil))
            .max()
    }
}
