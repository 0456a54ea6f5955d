//! ISO 26262 hardware architectural metrics.
//!
//! Per-mode FIT is routed into five fault buckets according to the mode's
//! classification and the diagnostic coverage `c` of the mechanism that
//! covers it:
//!
//! | Classification               | c · FIT        | (1 − c) · FIT  |
//! |------------------------------|----------------|----------------|
//! | safe                         | safe           | safe           |
//! | single-point, residual       | safe-covered   | SPF-residual   |
//! | latent multi-point, dual     | MPF-detected   | MPF-latent     |
//! | detected multi-point         | MPF-detected   | MPF-detected   |
//!
//! With the default [`MetricBasis::TotalFit`]:
//!
//! ```text
//! SPFM = 1 − Σ SPF-residual / Σ total
//! LFM  = 1 − Σ MPF-latent / (Σ total − Σ SPF-residual − Σ safe)
//! ```
//!
//! A zero denominator makes the metric not applicable.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::fmeda::asil::{Asil, AsilThresholds};
use crate::fmeda::component::Component;
use crate::fmeda::mechanisms::MechanismSet;
use crate::fmeda::modes::{FaultClass, ModeDistribution};

/// Accumulated FIT per fault bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultBuckets {
    /// Safe faults.
    pub safe: f64,
    /// Uncovered share of single-point and residual faults.
    pub spf_residual: f64,
    /// Uncovered share of latent and dual-point faults.
    pub mpf_latent: f64,
    /// Detected or perceived multi-point faults.
    pub mpf_detected: f64,
    /// Covered share of single-point and residual faults.
    pub safe_covered: f64,
}

impl FaultBuckets {
    /// Routes `fit` of one mode into the buckets.
    ///
    /// `coverage` must lie in [0, 1].
    #[must_use]
    pub fn route(fit: f64, classification: FaultClass, coverage: f64) -> Self {
        let covered = fit * coverage;
        let residual = fit - covered;
        match classification {
            FaultClass::Safe => Self {
                safe: fit,
                ..Self::default()
            },
            FaultClass::SinglePoint | FaultClass::Residual => Self {
                safe_covered: covered,
                spf_residual: residual,
                ..Self::default()
            },
            FaultClass::LatentMultiPoint | FaultClass::DualPoint => Self {
                mpf_detected: covered,
                mpf_latent: residual,
                ..Self::default()
            },
            FaultClass::DetectedMultiPoint => Self {
                mpf_detected: fit,
                ..Self::default()
            },
        }
    }

    /// Sum of all buckets.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.safe + self.spf_residual + self.mpf_latent + self.mpf_detected + self.safe_covered
    }
}

impl Add for FaultBuckets {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            safe: self.safe + rhs.safe,
            spf_residual: self.spf_residual + rhs.spf_residual,
            mpf_latent: self.mpf_latent + rhs.mpf_latent,
            mpf_detected: self.mpf_detected + rhs.mpf_detected,
            safe_covered: self.safe_covered + rhs.safe_covered,
        }
    }
}

impl AddAssign for FaultBuckets {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for FaultBuckets {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// A metric value, or the marker for a zero denominator.
///
/// Serialises as a number, or `null` when not applicable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum MetricValue {
    /// Fraction in [0, 1].
    Applicable(f64),
    /// The denominator was zero.
    NotApplicable,
}

impl MetricValue {
    /// Computes `1 − numerator / denominator`, clamped to [0, 1].
    #[must_use]
    pub fn complement_ratio(numerator: f64, denominator: f64) -> Self {
        if denominator > 0.0 && denominator.is_finite() {
            Self::Applicable((1.0 - numerator / denominator).clamp(0.0, 1.0))
        } else {
            Self::NotApplicable
        }
    }

    /// The fraction, if applicable.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Applicable(v) => Some(v),
            Self::NotApplicable => None,
        }
    }

    /// Returns true for [`MetricValue::NotApplicable`].
    #[must_use]
    pub const fn is_not_applicable(self) -> bool {
        matches!(self, Self::NotApplicable)
    }

    /// Formats as a percentage with `precision` decimals, or "N/A".
    #[must_use]
    pub fn percent(self, precision: usize) -> String {
        match self {
            Self::Applicable(v) => format!("{:.precision$}%", v * 100.0),
            Self::NotApplicable => "N/A".to_string(),
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::NotApplicable, Self::Applicable)
    }
}

impl From<MetricValue> for Option<f64> {
    fn from(value: MetricValue) -> Self {
        value.value()
    }
}

/// ASIL verdict of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Verdict {
    /// Both metrics meet their targets.
    Pass,
    /// SPFM is below target.
    FailSpfm,
    /// LFM is below target.
    FailLfm,
    /// Both metrics are below target.
    FailBoth,
    /// Neither metric could be computed.
    NotApplicable,
}

impl Verdict {
    /// Returns true for the failing variants.
    #[must_use]
    pub const fn is_fail(self) -> bool {
        matches!(self, Self::FailSpfm | Self::FailLfm | Self::FailBoth)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::FailSpfm => write!(f, "FAIL-SPFM"),
            Self::FailLfm => write!(f, "FAIL-LFM"),
            Self::FailBoth => write!(f, "FAIL-BOTH"),
            Self::NotApplicable => write!(f, "NOT-APPLICABLE"),
        }
    }
}

/// Which FIT the metric denominators are taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricBasis {
    /// SPFM over all FIT; LFM over all FIT less SPF-residual and safe.
    #[default]
    TotalFit,
    /// SPFM over safety-related FIT (total less safe); LFM over
    /// safety-related FIT less SPF-residual and safe-covered.
    SafetyRelated,
}

/// Running state of one aggregation scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetAnalysis {
    /// Sheet identifier.
    pub sheet: String,
    /// Target ASIL.
    pub target_asil: Asil,
    /// Accumulated FIT.
    pub buckets: FaultBuckets,
    /// Components processed.
    pub component_count: usize,
    /// Failure-mode contributions processed.
    pub mode_count: usize,
}

impl SheetAnalysis {
    /// Starts an empty analysis.
    #[must_use]
    pub fn new(sheet: impl Into<String>, target_asil: Asil) -> Self {
        Self {
            sheet: sheet.into(),
            target_asil,
            buckets: FaultBuckets::default(),
            component_count: 0,
            mode_count: 0,
        }
    }
}

/// Finalised metrics of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArchitecturalMetrics {
    /// Single-point fault metric.
    pub spfm: MetricValue,
    /// Latent fault metric.
    pub lfm: MetricValue,
    /// Verdict against the target ASIL.
    pub verdict: Verdict,
}

/// Accumulates mode contributions and finalises SPFM, LFM and verdict.
#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    thresholds: AsilThresholds,
    basis: MetricBasis,
}

impl MetricsCalculator {
    /// Creates a calculator with a threshold table and metric basis.
    #[must_use]
    pub const fn new(thresholds: AsilThresholds, basis: MetricBasis) -> Self {
        Self { thresholds, basis }
    }

    /// The threshold table.
    #[must_use]
    pub const fn thresholds(&self) -> &AsilThresholds {
        &self.thresholds
    }

    /// Buckets for one component's distribution, without mutating state.
    #[must_use]
    pub fn contributions(
        component: &Component,
        distribution: &ModeDistribution<'_>,
        mechanisms: &MechanismSet,
    ) -> FaultBuckets {
        distribution
            .iter()
            .map(|contribution| {
                let cov = mechanisms.lookup(component, contribution.mode);
                tracing::trace!(
                    designator = %component.designator,
                    mode = %contribution.mode.name,
                    fit = contribution.fit,
                    coverage = cov.coverage,
                    classification = %cov.classification,
                    "Routed failure mode"
                );
                FaultBuckets::route(contribution.fit, cov.classification, cov.coverage)
            })
            .sum()
    }

    /// Adds one component's mode contributions to `analysis`.
    pub fn accumulate(
        &self,
        analysis: &mut SheetAnalysis,
        component: &Component,
        distribution: &ModeDistribution<'_>,
        mechanisms: &MechanismSet,
    ) {
        analysis.buckets += Self::contributions(component, distribution, mechanisms);
        analysis.component_count += 1;
        analysis.mode_count += distribution.contributions.len();
    }

    /// SPFM and LFM of a set of buckets.
    ///
    /// Each denominator is summed from the buckets it covers, never obtained
    /// by subtraction from the total, so an empty scope is exactly zero.
    #[must_use]
    pub fn metrics(&self, buckets: &FaultBuckets) -> (MetricValue, MetricValue) {
        let multi_point = buckets.mpf_latent + buckets.mpf_detected;
        match self.basis {
            MetricBasis::TotalFit => (
                MetricValue::complement_ratio(buckets.spf_residual, buckets.total()),
                MetricValue::complement_ratio(
                    buckets.mpf_latent,
                    multi_point + buckets.safe_covered,
                ),
            ),
            MetricBasis::SafetyRelated => (
                MetricValue::complement_ratio(
                    buckets.spf_residual,
                    buckets.spf_residual + buckets.safe_covered + multi_point,
                ),
                MetricValue::complement_ratio(buckets.mpf_latent, multi_point),
            ),
        }
    }

    /// Computes SPFM, LFM and the verdict for the analysis's target ASIL.
    #[must_use]
    pub fn finalize(&self, analysis: &SheetAnalysis) -> ArchitecturalMetrics {
        let (spfm, lfm) = self.metrics(&analysis.buckets);
        let verdict = self.thresholds.verdict(analysis.target_asil, spfm, lfm);
        ArchitecturalMetrics { spfm, lfm, verdict }
    }
}
