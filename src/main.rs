//! fmeda-calc: FMEDA calculator for ISO 26262 hardware safety analysis
//!
//! Reads a BOM, optional safety mechanisms, sheet targets and component
//! library, and prints per-sheet SPFM, LFM and ASIL verdicts.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use fmeda_calc::config;
use fmeda_calc::error::InputError;
use fmeda_calc::fmeda::{
    BomRow, ComponentLibrary, FmedaReport, MechanismSet, Pipeline, SheetTargets,
};
use fmeda_calc::input;

/// Exit code when configuration or input files are invalid.
const EXIT_INPUT_ERROR: u8 = 1;

/// Exit code when a sheet failed its targets or could not be processed.
const EXIT_SHEET_PROBLEM: u8 = 2;

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Plain-text table.
    Table,
    /// Pretty-printed JSON.
    Json,
    /// One CSV record per sheet.
    Csv,
}

/// FMEDA calculator for ISO 26262 hardware safety analysis.
///
/// Derates failure rates per SN 29500, distributes them across IEC 61709
/// failure modes and reports SPFM, LFM and ASIL verdicts per schematic sheet.
#[derive(Parser, Debug)]
#[command(name = "fmeda-calc")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// BOM CSV file
    #[arg(long, value_name = "CSV")]
    bom: PathBuf,

    /// Component library JSON file (built-in tables if omitted)
    #[arg(long, value_name = "JSON")]
    library: Option<PathBuf>,

    /// Safety-mechanism CSV file
    #[arg(long, value_name = "CSV")]
    mechanisms: Option<PathBuf>,

    /// Sheet target CSV file (target ASIL and temperature per sheet)
    #[arg(long, value_name = "CSV")]
    sheets: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Process sheets one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Input files loaded for one run.
struct Inputs {
    rows: Vec<BomRow>,
    library: ComponentLibrary,
    mechanisms: MechanismSet,
    targets: SheetTargets,
}

fn load_inputs(args: &Args) -> Result<Inputs, InputError> {
    let library = match &args.library {
        Some(path) => input::load_library(path)?,
        None => ComponentLibrary::builtin(),
    };
    let mechanisms = match &args.mechanisms {
        Some(path) => input::read_mechanisms(path)?,
        None => MechanismSet::empty(),
    };
    let targets = match &args.sheets {
        Some(path) => input::read_sheet_targets(path)?,
        None => SheetTargets::new(),
    };
    let rows = input::read_bom(&args.bom)?;
    Ok(Inputs {
        rows,
        library,
        mechanisms,
        targets,
    })
}

fn write_report(report: &FmedaReport, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    match format {
        Format::Table => write!(stdout.lock(), "{}", report.render_table())?,
        Format::Json => writeln!(stdout.lock(), "{}", report.to_json()?)?,
        Format::Csv => report.write_csv(stdout.lock())?,
    }
    Ok(())
}

/// Prints an error with its chain of causes.
fn report_error(context: &str, err: &dyn std::error::Error) {
    eprintln!("{context}: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

/// Entry point for the fmeda-calc tool.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config_or_default(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            report_error("Configuration error", &e);
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting fmeda-calc");

    let inputs = match load_inputs(&args) {
        Ok(inputs) => inputs,
        Err(e) => {
            report_error("Input error", &e);
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };

    let mut settings = cfg.analysis_settings();
    if args.sequential {
        settings.parallel = false;
    }

    let pipeline = Pipeline::new(settings, inputs.library);
    let report = pipeline.run(&inputs.rows, &inputs.mechanisms, &inputs.targets);

    info!(
        sheets = report.sheets.len(),
        total_fit = report.summary.total_fit,
        "Analysis complete"
    );

    if let Err(e) = write_report(&report, args.format) {
        error!(error = %e, "Failed to write report");
        return ExitCode::FAILURE;
    }

    if report.has_problems() {
        ExitCode::from(EXIT_SHEET_PROBLEM)
    } else {
        ExitCode::SUCCESS
    }
}
