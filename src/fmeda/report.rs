//! Per-sheet report rows and the project summary.
//!
//! Reports carry unrounded fractions alongside percentage strings formatted
//! with the configured precision. A sheet whose processing failed carries
//! the error message and no metrics.

use std::fmt::Write as _;
use std::io;

use indexmap::IndexMap;
use serde::Serialize;

use crate::fmeda::asil::{Asil, AsilThresholds};
use crate::fmeda::error::FmedaError;
use crate::fmeda::metrics::{
    ArchitecturalMetrics, FaultBuckets, MetricValue, MetricsCalculator, SheetAnalysis, Verdict,
};

/// Default number of decimals in percentage strings.
pub const DEFAULT_PRECISION: usize = 2;

/// Hours per 10⁹ device-hours, the FIT unit.
const FIT_HOURS: f64 = 1e9;

/// Formats a metric as a percentage, or "N/A".
#[must_use]
pub fn format_percent(value: MetricValue, precision: usize) -> String {
    value.percent(precision)
}

/// Metrics of a sheet that was processed to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetResult {
    /// Single-point fault metric.
    pub spfm: MetricValue,
    /// Latent fault metric.
    pub lfm: MetricValue,
    /// SPFM as a percentage string.
    pub spfm_percent: String,
    /// LFM as a percentage string.
    pub lfm_percent: String,
    /// Verdict against the sheet's target ASIL.
    pub verdict: Verdict,
    /// Sum of all buckets (FIT).
    pub total_fit: f64,
    /// Bucket sums (FIT).
    pub buckets: FaultBuckets,
    /// Components processed.
    pub component_count: usize,
    /// Failure-mode contributions processed.
    pub mode_count: usize,
    /// Pass flag per ASIL in the threshold table.
    pub compliance: IndexMap<Asil, bool>,
    /// Highest ASIL whose targets are met.
    pub highest_asil: Option<Asil>,
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetReport {
    /// Sheet identifier.
    pub sheet: String,
    /// Target ASIL.
    pub target_asil: Asil,
    /// Metrics, if the sheet was processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SheetResult>,
    /// Error message, if processing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SheetReport {
    /// Builds the row of a completed sheet.
    #[must_use]
    pub fn completed(
        analysis: &SheetAnalysis,
        metrics: ArchitecturalMetrics,
        thresholds: &AsilThresholds,
        precision: usize,
    ) -> Self {
        Self {
            sheet: analysis.sheet.clone(),
            target_asil: analysis.target_asil,
            result: Some(SheetResult {
                spfm: metrics.spfm,
                lfm: metrics.lfm,
                spfm_percent: format_percent(metrics.spfm, precision),
                lfm_percent: format_percent(metrics.lfm, precision),
                verdict: metrics.verdict,
                total_fit: analysis.buckets.total(),
                buckets: analysis.buckets,
                component_count: analysis.component_count,
                mode_count: analysis.mode_count,
                compliance: thresholds.compliance(metrics.spfm, metrics.lfm),
                highest_asil: thresholds.highest_met(metrics.spfm, metrics.lfm),
            }),
            error: None,
        }
    }

    /// Builds the row of a sheet whose processing failed.
    #[must_use]
    pub fn failed(sheet: impl Into<String>, target_asil: Asil, error: &FmedaError) -> Self {
        Self {
            sheet: sheet.into(),
            target_asil,
            result: None,
            error: Some(error.to_string()),
        }
    }

    /// Verdict, or `None` for a failed sheet.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        self.result.as_ref().map(|r| r.verdict)
    }

    /// Returns true if the sheet failed its targets or could not be processed.
    #[must_use]
    pub fn is_problem(&self) -> bool {
        self.verdict().map_or(true, Verdict::is_fail)
    }
}

/// Project-wide aggregate over all completed, applicable sheets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    /// Bucket sums (FIT).
    pub buckets: FaultBuckets,
    /// Sum of all buckets (FIT).
    pub total_fit: f64,
    /// Project SPFM.
    pub spfm: MetricValue,
    /// Project LFM.
    pub lfm: MetricValue,
    /// SPFM as a percentage string.
    pub spfm_percent: String,
    /// LFM as a percentage string.
    pub lfm_percent: String,
    /// Mean time to failure in hours, `None` for zero FIT.
    pub mttf_hours: Option<f64>,
    /// Pass flag per ASIL in the threshold table.
    pub compliance: IndexMap<Asil, bool>,
    /// Highest ASIL whose targets are met at project level.
    pub highest_asil: Option<Asil>,
    /// Sheets that passed.
    pub sheets_passed: usize,
    /// Sheets that failed a target.
    pub sheets_failed: usize,
    /// Sheets with no applicable metric.
    pub sheets_not_applicable: usize,
    /// Sheets that could not be processed.
    pub sheets_errored: usize,
}

impl ProjectSummary {
    /// Aggregates the sheet rows.
    ///
    /// Only sheets whose verdict is `NOT-APPLICABLE` (both metrics not
    /// applicable) are left out; a sheet with one applicable metric still
    /// contributes its buckets. Components listed on several sheets count
    /// once per sheet.
    #[must_use]
    pub fn from_sheets(sheets: &[SheetReport], calculator: &MetricsCalculator, precision: usize) -> Self {
        let buckets: FaultBuckets = sheets
            .iter()
            .filter_map(|s| s.result.as_ref())
            .filter(|r| r.verdict != Verdict::NotApplicable)
            .map(|r| r.buckets)
            .sum();

        let count = |pred: fn(Option<Verdict>) -> bool| sheets.iter().filter(|s| pred(s.verdict())).count();

        let (spfm, lfm) = calculator.metrics(&buckets);
        let total_fit = buckets.total();
        let thresholds = calculator.thresholds();

        Self {
            buckets,
            total_fit,
            spfm,
            lfm,
            spfm_percent: format_percent(spfm, precision),
            lfm_percent: format_percent(lfm, precision),
            mttf_hours: (total_fit > 0.0).then(|| FIT_HOURS / total_fit),
            compliance: thresholds.compliance(spfm, lfm),
            highest_asil: thresholds.highest_met(spfm, lfm),
            sheets_passed: count(|v| v == Some(Verdict::Pass)),
            sheets_failed: count(|v| v.is_some_and(Verdict::is_fail)),
            sheets_not_applicable: count(|v| v == Some(Verdict::NotApplicable)),
            sheets_errored: count(|v| v.is_none()),
        }
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FmedaReport {
    /// One row per sheet, in order of first appearance.
    pub sheets: Vec<SheetReport>,
    /// Project aggregate.
    pub summary: ProjectSummary,
    /// Decimals used for FIT values in rendered output.
    #[serde(skip)]
    pub precision: usize,
}

/// CSV row layout.
#[derive(Serialize)]
struct CsvRow<'a> {
    sheet: &'a str,
    target_asil: String,
    total_fit: Option<f64>,
    safe: Option<f64>,
    spf_residual: Option<f64>,
    mpf_latent: Option<f64>,
    mpf_detected: Option<f64>,
    safe_covered: Option<f64>,
    spfm: Option<String>,
    lfm: Option<String>,
    verdict: Option<String>,
    error: Option<&'a str>,
}

impl FmedaReport {
    /// Returns true if any sheet failed a target or could not be processed.
    #[must_use]
    pub fn has_problems(&self) -> bool {
        self.sheets.iter().any(SheetReport::is_problem)
    }

    /// Looks up a sheet row by identifier.
    #[must_use]
    pub fn sheet(&self, sheet: &str) -> Option<&SheetReport> {
        self.sheets.iter().find(|s| s.sheet == sheet)
    }

    /// Renders a plain-text table followed by the project summary.
    #[must_use]
    pub fn render_table(&self) -> String {
        let p = self.precision;
        let width = self
            .sheets
            .iter()
            .map(|s| s.sheet.len())
            .max()
            .unwrap_or(0)
            .max("Sheet".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$}  {:<7}  {:>12}  {:>9}  {:>9}  {}",
            "Sheet", "Target", "Total FIT", "SPFM", "LFM", "Verdict"
        );
        for sheet in &self.sheets {
            match (&sheet.result, &sheet.error) {
                (Some(r), _) => {
                    let _ = writeln!(
                        out,
                        "{:<width$}  {:<7}  {:>12.p$}  {:>9}  {:>9}  {}",
                        sheet.sheet,
                        sheet.target_asil.to_string(),
                        r.total_fit,
                        r.spfm_percent,
                        r.lfm_percent,
                        r.verdict
                    );
                }
                (None, error) => {
                    let _ = writeln!(
                        out,
                        "{:<width$}  {:<7}  ERROR: {}",
                        sheet.sheet,
                        sheet.target_asil.to_string(),
                        error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }

        let s = &self.summary;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Project: total {:.p$} FIT, SPFM {}, LFM {}, MTTF {}",
            s.total_fit,
            s.spfm_percent,
            s.lfm_percent,
            s.mttf_hours.map_or_else(|| "N/A".to_string(), |h| format!("{h:.0} h"))
        );
        let _ = writeln!(
            out,
            "Sheets: {} passed, {} failed, {} not applicable, {} errored",
            s.sheets_passed, s.sheets_failed, s.sheets_not_applicable, s.sheets_errored
        );
        out
    }

    /// Renders the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes one CSV record per sheet.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        for sheet in &self.sheets {
            let r = sheet.result.as_ref();
            wtr.serialize(CsvRow {
                sheet: &sheet.sheet,
                target_asil: sheet.target_asil.to_string(),
                total_fit: r.map(|r| r.total_fit),
                safe: r.map(|r| r.buckets.safe),
                spf_residual: r.map(|r| r.buckets.spf_residual),
                mpf_latent: r.map(|r| r.buckets.mpf_latent),
                mpf_detected: r.map(|r| r.buckets.mpf_detected),
                safe_covered: r.map(|r| r.buckets.safe_covered),
                spfm: r.map(|r| r.spfm_percent.clone()),
                lfm: r.map(|r| r.lfm_percent.clone()),
                verdict: r.map(|r| r.verdict.to_string()),
                error: sheet.error.as_deref(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}
