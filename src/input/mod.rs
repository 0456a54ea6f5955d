//! Readers for the command-line tool's input files.
//!
//! - BOM: CSV, one [`BomRow`] per record
//! - Safety mechanisms: CSV, one [`SafetyMechanism`] per record
//! - Sheet targets: CSV, one [`SheetProfile`] per record
//! - Component library: JSON, see [`crate::fmeda::library`]
//!
//! Headers are matched by name; the spreadsheet column names of existing
//! FMEDA workbooks (`Designator`, `SheetNumber`, `DC_Coverage`, ...) are
//! accepted as aliases. Unknown columns are ignored.
//!
//! A mechanism record classifies faults either with a `classification`
//! column or with the workbook flag pair `Safety_Related` / `Is_SPF`:
//! not safety related is safe, safety related and SPF is single-point, and
//! safety related without SPF is latent multi-point with its coverage read
//! from `DC_Latent`. A record that uses both forms is rejected.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::InputError;
use crate::fmeda::asil::Asil;
use crate::fmeda::component::{non_blank, BomRow, ComponentClass};
use crate::fmeda::error::{FmedaError, FmedaResult};
use crate::fmeda::library::ComponentLibrary;
use crate::fmeda::mechanisms::{MechanismSet, SafetyMechanism};
use crate::fmeda::modes::FaultClass;
use crate::fmeda::pipeline::{SheetProfile, SheetTargets};

/// One record of the safety-mechanism table, as text.
#[derive(Debug, Clone, Default, Deserialize)]
struct MechanismRecord {
    #[serde(default, alias = "Name", alias = "Mechanism")]
    name: Option<String>,
    #[serde(default, alias = "SheetNumber", alias = "Sheet")]
    sheet: Option<String>,
    #[serde(default, alias = "Component_Class", alias = "Component_Type")]
    class: Option<String>,
    #[serde(default, alias = "Designator")]
    designator: Option<String>,
    #[serde(default, alias = "Failure_Mode", alias = "Mode")]
    mode: Option<String>,
    #[serde(default, alias = "DC_Coverage", alias = "Coverage")]
    coverage: Option<String>,
    #[serde(default, alias = "Classification")]
    classification: Option<String>,
    #[serde(default, alias = "Safety_Related")]
    safety_related: Option<String>,
    #[serde(default, alias = "Is_SPF")]
    is_spf: Option<String>,
    #[serde(default, alias = "DC_Latent")]
    latent_coverage: Option<String>,
}

impl MechanismRecord {
    /// Classification given by the `Safety_Related` / `Is_SPF` flag pair.
    fn flag_classification(&self) -> FmedaResult<Option<FaultClass>> {
        let is_spf = non_blank(self.is_spf.as_deref())
            .map(|text| parse_flag("Is_SPF", text))
            .transpose()?;
        let Some(text) = non_blank(self.safety_related.as_deref()) else {
            return match is_spf {
                Some(_) => Err(FmedaError::invalid_input(
                    "Is_SPF",
                    "Is_SPF requires a Safety_Related value",
                )),
                None => Ok(None),
            };
        };
        Ok(Some(match (parse_flag("Safety_Related", text)?, is_spf) {
            (false, _) => FaultClass::Safe,
            (true, Some(true)) => FaultClass::SinglePoint,
            (true, _) => FaultClass::LatentMultiPoint,
        }))
    }

    fn into_mechanism(self, record: usize) -> FmedaResult<SafetyMechanism> {
        let flagged = self.flag_classification()?;
        let explicit = non_blank(self.classification.as_deref())
            .map(str::parse::<FaultClass>)
            .transpose()?;
        let classification = match (explicit, flagged) {
            (Some(_), Some(_)) => {
                return Err(FmedaError::invalid_input(
                    "classification",
                    "both a classification and Safety_Related/Is_SPF flags are given",
                ))
            }
            (explicit, flagged) => explicit.or(flagged),
        };

        let latent = matches!(
            classification,
            Some(FaultClass::LatentMultiPoint | FaultClass::DualPoint)
        );
        let coverage = match (
            non_blank(self.coverage.as_deref()),
            non_blank(self.latent_coverage.as_deref()),
        ) {
            (_, Some(text)) if latent => parse_coverage(text)?,
            (_, Some(_)) => {
                return Err(FmedaError::invalid_input(
                    "DC_Latent",
                    "latent coverage only applies to latent multi-point rules",
                ))
            }
            // Flagged multi-point rules take their coverage from DC_Latent only
            _ if latent && flagged.is_some() => 0.0,
            (Some(text), None) => parse_coverage(text)?,
            (None, None) => 0.0,
        };

        let mut mechanism = SafetyMechanism::new(
            non_blank(self.name.as_deref()).map_or_else(|| format!("mechanism {record}"), str::to_string),
            coverage,
        );
        mechanism.sheet = self.sheet;
        mechanism.designator = self.designator;
        mechanism.mode = self.mode;
        mechanism.class = match non_blank(self.class.as_deref()) {
            Some(text) if text != "*" && !text.eq_ignore_ascii_case("ALL") => Some(text.parse::<ComponentClass>()?),
            _ => None,
        };
        mechanism.classification = classification;
        Ok(mechanism)
    }
}

/// One record of the sheet-target table, as text.
#[derive(Debug, Clone, Default, Deserialize)]
struct SheetRecord {
    #[serde(default, alias = "SheetNumber", alias = "Sheet")]
    sheet: Option<String>,
    #[serde(default, alias = "Target_ASIL", alias = "ASIL")]
    target_asil: Option<String>,
    #[serde(default, alias = "Local_Temp", alias = "temperature")]
    temperature_c: Option<String>,
}

impl SheetRecord {
    fn into_profile(self) -> FmedaResult<(String, SheetProfile)> {
        let sheet = non_blank(self.sheet.as_deref())
            .ok_or_else(|| FmedaError::invalid_input("sheet", "missing sheet identifier"))?
            .to_string();
        let target_asil = non_blank(self.target_asil.as_deref())
            .map(str::parse::<Asil>)
            .transpose()?;
        let temperature_c = non_blank(self.temperature_c.as_deref())
            .map(|text| {
                text.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                    FmedaError::invalid_input("temperature_c", format!("'{text}' is not a number"))
                })
            })
            .transpose()?;
        Ok((
            sheet,
            SheetProfile {
                target_asil,
                temperature_c,
            },
        ))
    }
}

/// Parses a spreadsheet boolean cell (`True`, `false`, `1`, `no`, ...).
fn parse_flag(field: &str, text: &str) -> FmedaResult<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(FmedaError::invalid_input(field, format!("'{text}' is not a boolean"))),
    }
}

/// Parses a coverage cell: a fraction (`0.99`) or a percentage (`99%`).
fn parse_coverage(text: &str) -> FmedaResult<f64> {
    let (number, scale) = text
        .strip_suffix('%')
        .map_or((text, 1.0), |n| (n.trim_end(), 100.0));
    number
        .parse::<f64>()
        .map(|v| v / scale)
        .map_err(|_| FmedaError::invalid_input("coverage", format!("'{text}' is not a number")))
}

fn csv_records<T: DeserializeOwned, R: Read>(reader: R, origin: &Path) -> Result<Vec<T>, InputError> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| InputError::CsvError {
            path: origin.to_path_buf(),
            source,
        })
}

fn open(path: &Path) -> Result<BufReader<File>, InputError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| InputError::ReadError {
            path: path.to_path_buf(),
            source,
        })
}

/// Parses BOM rows from CSV. `origin` names the source in errors.
///
/// # Errors
///
/// Returns [`InputError::CsvError`] if the CSV is malformed.
pub fn bom_from_reader<R: Read>(reader: R, origin: &Path) -> Result<Vec<BomRow>, InputError> {
    csv_records(reader, origin)
}

/// Reads the BOM CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_bom(path: &Path) -> Result<Vec<BomRow>, InputError> {
    let rows = bom_from_reader(open(path)?, path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded BOM");
    Ok(rows)
}

/// Parses safety mechanisms from CSV.
///
/// # Errors
///
/// Returns [`InputError::CsvError`] for malformed CSV and
/// [`InputError::InvalidRecord`] for a bad class, classification or coverage.
pub fn mechanisms_from_reader<R: Read>(reader: R, origin: &Path) -> Result<MechanismSet, InputError> {
    let records: Vec<MechanismRecord> = csv_records(reader, origin)?;
    let invalid = |record: usize, source: FmedaError| InputError::InvalidRecord {
        path: origin.to_path_buf(),
        record,
        source,
    };

    let mut set = MechanismSet::empty();
    for (index, record) in records.into_iter().enumerate() {
        let number = index + 1;
        record
            .into_mechanism(number)
            .and_then(|mechanism| set.push(mechanism))
            .map_err(|e| invalid(number, e))?;
    }
    Ok(set)
}

/// Reads the safety-mechanism CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds an invalid record.
pub fn read_mechanisms(path: &Path) -> Result<MechanismSet, InputError> {
    let set = mechanisms_from_reader(open(path)?, path)?;
    tracing::info!(path = %path.display(), mechanisms = set.len(), "Loaded safety mechanisms");
    Ok(set)
}

/// Parses sheet targets from CSV.
///
/// # Errors
///
/// Returns [`InputError::CsvError`] for malformed CSV and
/// [`InputError::InvalidRecord`] for a missing sheet, bad ASIL or temperature.
pub fn sheet_targets_from_reader<R: Read>(reader: R, origin: &Path) -> Result<SheetTargets, InputError> {
    let records: Vec<SheetRecord> = csv_records(reader, origin)?;
    let mut targets = SheetTargets::new();
    for (index, record) in records.into_iter().enumerate() {
        let (sheet, profile) = record.into_profile().map_err(|source| InputError::InvalidRecord {
            path: origin.to_path_buf(),
            record: index + 1,
            source,
        })?;
        targets.insert(sheet, profile);
    }
    Ok(targets)
}

/// Reads the sheet-target CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds an invalid record.
pub fn read_sheet_targets(path: &Path) -> Result<SheetTargets, InputError> {
    let targets = sheet_targets_from_reader(open(path)?, path)?;
    tracing::info!(path = %path.display(), sheets = targets.len(), "Loaded sheet targets");
    Ok(targets)
}

/// Reads and validates a component library JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON or fails
/// library validation.
pub fn load_library(path: &Path) -> Result<ComponentLibrary, InputError> {
    let contents = std::fs::read_to_string(path).map_err(|source| InputError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let library = ComponentLibrary::from_json(&contents).map_err(|source| InputError::JsonError {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        classes = library.classes().count(),
        footprints = library.footprint_count(),
        "Loaded component library"
    );
    Ok(library)
}
