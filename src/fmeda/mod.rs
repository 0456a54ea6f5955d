//! FMEDA calculation core.
//!
//! The pipeline turns BOM rows into per-sheet ISO 26262 architectural
//! metrics:
//!
//! ```text
//! BomRow ─► Component ─► FailureRateModel ─► FailureModeDistributor
//!                         (SN 29500)          (IEC 61709)
//!                                                  │
//!          SheetReport ◄─ MetricsCalculator ◄──────┘
//!                         (ISO 26262-5, per sheet)
//! ```
//!
//! # Modules
//!
//! - [`fit`]: Arrhenius temperature derating
//! - [`modes`]: failure-mode tables and FIT distribution
//! - [`metrics`]: fault buckets, SPFM, LFM and verdicts
//! - [`asil`]: ASIL levels and metric targets
//! - [`pipeline`]: multi-sheet orchestration
//! - [`report`]: report rows, project summary and rendering
//! - [`component`], [`library`], [`mechanisms`]: input data
//! - [`error`]: error types

pub mod asil;
pub mod component;
pub mod error;
pub mod fit;
pub mod library;
pub mod mechanisms;
pub mod metrics;
pub mod modes;
pub mod pipeline;
pub mod report;

pub use asil::{Asil, AsilThresholds, Threshold};
pub use component::{BomRow, Component, ComponentClass, UNASSIGNED_SHEET};
pub use error::{FmedaError, FmedaResult};
pub use fit::{acceleration_factor, derate, FailureRateModel};
pub use library::{ClassProfile, ComponentLibrary, FootprintEntry};
pub use mechanisms::{Coverage, MechanismSet, SafetyMechanism};
pub use metrics::{
    ArchitecturalMetrics, FaultBuckets, MetricBasis, MetricValue, MetricsCalculator, SheetAnalysis,
    Verdict,
};
pub use modes::{FailureMode, FailureModeDistributor, FaultClass, ModeContribution, ModeDistribution};
pub use pipeline::{AnalysisSettings, Pipeline, SheetProfile, SheetTargets};
pub use report::{format_percent, FmedaReport, ProjectSummary, SheetReport, SheetResult};
