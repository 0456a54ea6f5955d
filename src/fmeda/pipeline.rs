//! Multi-sheet orchestration.
//!
//! The pipeline groups BOM rows by sheet, then runs each sheet through
//! validation, derating, failure-mode distribution and metric accumulation.
//! Sheets are independent: they may be processed in parallel, and an error
//! in one sheet is reported on that sheet's row without affecting others.
//!
//! # Example
//!
//! ```
//! use fmeda_calc::fmeda::{
//!     AnalysisSettings, BomRow, ComponentLibrary, MechanismSet, Pipeline, SheetTargets, Verdict,
//! };
//!
//! let rows = vec![BomRow::new("R1", "1")
//!     .with_class("Resistor")
//!     .with_reference_fit(10.0)
//!     .with_temperature("40")];
//!
//! let pipeline = Pipeline::new(AnalysisSettings::default(), ComponentLibrary::builtin());
//! let report = pipeline.run(&rows, &MechanismSet::empty(), &SheetTargets::new());
//!
//! let sheet = report.sheet("1").unwrap();
//! assert_eq!(sheet.verdict(), Some(Verdict::FailSpfm));
//! ```

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fmeda::asil::{Asil, AsilThresholds};
use crate::fmeda::component::{BomRow, Component};
use crate::fmeda::error::{FmedaError, FmedaResult};
use crate::fmeda::fit::{FailureRateModel, DEFAULT_REFERENCE_TEMPERATURE_C};
use crate::fmeda::library::ComponentLibrary;
use crate::fmeda::mechanisms::MechanismSet;
use crate::fmeda::metrics::{MetricBasis, MetricsCalculator, SheetAnalysis};
use crate::fmeda::modes::FailureModeDistributor;
use crate::fmeda::report::{FmedaReport, ProjectSummary, SheetReport, DEFAULT_PRECISION};

/// Settings that shape one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Reference temperature of the FIT values (°C).
    pub reference_temperature_c: f64,
    /// Target ASIL for sheets without their own.
    pub default_target_asil: Asil,
    /// Denominator basis for SPFM and LFM.
    pub metric_basis: MetricBasis,
    /// Process sheets on the rayon thread pool.
    pub parallel: bool,
    /// ASIL targets.
    pub thresholds: AsilThresholds,
    /// Decimals in percentage strings.
    pub precision: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            reference_temperature_c: DEFAULT_REFERENCE_TEMPERATURE_C,
            default_target_asil: Asil::D,
            metric_basis: MetricBasis::default(),
            parallel: true,
            thresholds: AsilThresholds::default(),
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Per-sheet analysis parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetProfile {
    /// Target ASIL; the configured default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_asil: Option<Asil>,

    /// Operating temperature for rows without their own (°C).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
}

impl SheetProfile {
    /// Profile with only a target ASIL.
    #[must_use]
    pub const fn target(asil: Asil) -> Self {
        Self {
            target_asil: Some(asil),
            temperature_c: None,
        }
    }

    /// Sets the sheet operating temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature_c: f64) -> Self {
        self.temperature_c = Some(temperature_c);
        self
    }
}

/// Sheet profiles in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetTargets {
    sheets: IndexMap<String, SheetProfile>,
}

impl SheetTargets {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the profile of a sheet.
    pub fn insert(&mut self, sheet: impl Into<String>, profile: SheetProfile) {
        self.sheets.insert(sheet.into(), profile);
    }

    /// Builder form of [`SheetTargets::insert`].
    #[must_use]
    pub fn with(mut self, sheet: impl Into<String>, profile: SheetProfile) -> Self {
        self.insert(sheet, profile);
        self
    }

    /// Profile of a sheet, if declared.
    #[must_use]
    pub fn get(&self, sheet: &str) -> Option<&SheetProfile> {
        self.sheets.get(sheet)
    }

    /// Declared sheets in order.
    pub fn sheets(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// Number of declared sheets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    /// Returns true if no sheet is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Rows of one sheet with their one-based BOM row numbers.
#[derive(Debug)]
struct SheetGroup<'a> {
    sheet: String,
    rows: Vec<(usize, &'a BomRow)>,
}

/// Groups rows by sheet in order of first appearance, then appends sheets
/// that are only declared in `targets`.
fn group_by_sheet<'a>(rows: &'a [BomRow], targets: &SheetTargets) -> Vec<SheetGroup<'a>> {
    let mut groups: IndexMap<String, Vec<(usize, &'a BomRow)>> = IndexMap::new();
    for (index, row) in rows.iter().enumerate() {
        for sheet in row.sheets() {
            groups.entry(sheet).or_default().push((index + 1, row));
        }
    }
    for sheet in targets.sheets() {
        if !groups.contains_key(sheet) {
            groups.insert(sheet.to_string(), Vec::new());
        }
    }
    groups
        .into_iter()
        .map(|(sheet, rows)| SheetGroup { sheet, rows })
        .collect()
}

/// Runs BOM rows through derating, distribution and metric calculation.
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: AnalysisSettings,
    library: ComponentLibrary,
    model: FailureRateModel,
    calculator: MetricsCalculator,
}

impl Pipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(settings: AnalysisSettings, library: ComponentLibrary) -> Self {
        let model = FailureRateModel::new(settings.reference_temperature_c);
        let calculator = MetricsCalculator::new(settings.thresholds.clone(), settings.metric_basis);
        Self {
            settings,
            library,
            model,
            calculator,
        }
    }

    /// The run settings.
    #[must_use]
    pub const fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// The component library.
    #[must_use]
    pub const fn library(&self) -> &ComponentLibrary {
        &self.library
    }

    /// Target ASIL of a sheet.
    fn target_for(&self, targets: &SheetTargets, sheet: &str) -> Asil {
        targets
            .get(sheet)
            .and_then(|p| p.target_asil)
            .unwrap_or(self.settings.default_target_asil)
    }

    /// Processes every sheet and builds the report.
    ///
    /// Never fails as a whole: sheet errors are recorded on their rows.
    #[must_use]
    pub fn run(&self, rows: &[BomRow], mechanisms: &MechanismSet, targets: &SheetTargets) -> FmedaReport {
        let groups = group_by_sheet(rows, targets);
        tracing::debug!(
            rows = rows.len(),
            sheets = groups.len(),
            mechanisms = mechanisms.len(),
            parallel = self.settings.parallel,
            "Starting FMEDA run"
        );

        let sheets: Vec<SheetReport> = if self.settings.parallel {
            groups
                .par_iter()
                .map(|group| self.sheet_report(group, mechanisms, targets))
                .collect()
        } else {
            groups
                .iter()
                .map(|group| self.sheet_report(group, mechanisms, targets))
                .collect()
        };

        let summary = ProjectSummary::from_sheets(&sheets, &self.calculator, self.settings.precision);
        FmedaReport {
            sheets,
            summary,
            precision: self.settings.precision,
        }
    }

    fn sheet_report(&self, group: &SheetGroup<'_>, mechanisms: &MechanismSet, targets: &SheetTargets) -> SheetReport {
        let target = self.target_for(targets, &group.sheet);
        let profile = targets.get(&group.sheet).copied().unwrap_or_default();

        match self.analyze_sheet(&group.sheet, target, &group.rows, mechanisms, profile.temperature_c) {
            Ok(analysis) => {
                let metrics = self.calculator.finalize(&analysis);
                tracing::debug!(
                    sheet = %group.sheet,
                    components = analysis.component_count,
                    total_fit = analysis.buckets.total(),
                    verdict = %metrics.verdict,
                    "Sheet analysed"
                );
                SheetReport::completed(
                    &analysis,
                    metrics,
                    self.calculator.thresholds(),
                    self.settings.precision,
                )
            }
            Err(err) => {
                let err = FmedaError::sheet(group.sheet.clone(), err);
                tracing::warn!(error = %err, "Sheet skipped");
                SheetReport::failed(group.sheet.clone(), target, &err)
            }
        }
    }

    /// Accumulates the rows of one sheet.
    ///
    /// Rows are `(row number, row)` pairs; the first bad row aborts the sheet.
    ///
    /// # Errors
    ///
    /// Returns the first validation, derating or distribution error.
    pub fn analyze_sheet(
        &self,
        sheet: &str,
        target_asil: Asil,
        rows: &[(usize, &BomRow)],
        mechanisms: &MechanismSet,
        fallback_temperature_c: Option<f64>,
    ) -> FmedaResult<SheetAnalysis> {
        let distributor = FailureModeDistributor::new(&self.library);
        let mut analysis = SheetAnalysis::new(sheet, target_asil);

        for (number, row) in rows {
            for component in row.to_components(*number, sheet, &self.library, fallback_temperature_c)? {
                self.accumulate_component(&mut analysis, &distributor, &component, mechanisms)?;
            }
        }
        Ok(analysis)
    }

    fn accumulate_component(
        &self,
        analysis: &mut SheetAnalysis,
        distributor: &FailureModeDistributor<'_>,
        component: &Component,
        mechanisms: &MechanismSet,
    ) -> FmedaResult<()> {
        let ea = self.library.activation_energy(component.class)?;
        let fit = self.model.derate(
            component.reference_fit,
            component.temperature_c,
            ea,
            component.class,
        )? * f64::from(component.quantity);

        tracing::trace!(
            designator = %component.designator,
            class = %component.class,
            reference_fit = component.reference_fit,
            temperature_c = component.temperature_c,
            fit,
            "Derated component"
        );

        let distribution = distributor.distribute(fit, component.class)?;
        self.calculator
            .accumulate(analysis, component, &distribution, mechanisms);
        Ok(())
    }
}
