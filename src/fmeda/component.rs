//! Component classes, raw BOM rows and validated components.
//!
//! The ingestion layer hands over [`BomRow`]s with every field still in
//! text form. Validation into [`Component`]s happens per sheet inside the
//! pipeline, so that a bad row only aborts the sheet it belongs to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fmeda::error::{FmedaError, FmedaResult};
use crate::fmeda::library::ComponentLibrary;

/// Sheet identifier used for rows whose sheet field is blank.
pub const UNASSIGNED_SHEET: &str = "(unassigned)";

/// Component class, the key into the failure-mode and activation-energy tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComponentClass {
    /// Fixed resistor.
    Resistor,
    /// Capacitor of unspecified dielectric.
    Capacitor,
    /// Multilayer ceramic capacitor.
    CapacitorCeramic,
    /// Aluminium or tantalum electrolytic capacitor.
    CapacitorElectrolytic,
    /// Inductor or ferrite.
    Inductor,
    /// Signal, rectifier, Zener or TVS diode.
    Diode,
    /// Bipolar junction transistor.
    TransistorBipolar,
    /// MOSFET.
    TransistorMosfet,
    /// Digital integrated circuit (MCU, logic, memory).
    IcDigital,
    /// Analogue integrated circuit (op-amp, sensor, regulator).
    IcAnalog,
    /// Connector or test point.
    Connector,
    /// Crystal or oscillator.
    CrystalOscillator,
}

impl ComponentClass {
    /// All classes in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Resistor,
        Self::Capacitor,
        Self::CapacitorCeramic,
        Self::CapacitorElectrolytic,
        Self::Inductor,
        Self::Diode,
        Self::TransistorBipolar,
        Self::TransistorMosfet,
        Self::IcDigital,
        Self::IcAnalog,
        Self::Connector,
        Self::CrystalOscillator,
    ];

    /// Canonical name as used in BOM and library files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Resistor => "Resistor",
            Self::Capacitor => "Capacitor",
            Self::CapacitorCeramic => "Capacitor_Ceramic",
            Self::CapacitorElectrolytic => "Capacitor_Electrolytic",
            Self::Inductor => "Inductor",
            Self::Diode => "Diode",
            Self::TransistorBipolar => "Transistor_Bipolar",
            Self::TransistorMosfet => "Transistor_MOSFET",
            Self::IcDigital => "IC_Digital",
            Self::IcAnalog => "IC_Analog",
            Self::Connector => "Connector",
            Self::CrystalOscillator => "Crystal_Oscillator",
        }
    }

    /// Parses a class from a string.
    ///
    /// Case-insensitive; `_`, `-` and spaces are interchangeable, so
    /// "ic digital", "IC-Digital" and "IC_DIGITAL" all parse.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        match key.as_str() {
            "RESISTOR" => Some(Self::Resistor),
            "CAPACITOR" => Some(Self::Capacitor),
            "CAPACITOR_CERAMIC" | "MLCC" => Some(Self::CapacitorCeramic),
            "CAPACITOR_ELECTROLYTIC" => Some(Self::CapacitorElectrolytic),
            "INDUCTOR" => Some(Self::Inductor),
            "DIODE" => Some(Self::Diode),
            "TRANSISTOR_BIPOLAR" | "TRANSISTOR_BJT" | "BJT" => Some(Self::TransistorBipolar),
            "TRANSISTOR_MOSFET" | "MOSFET" => Some(Self::TransistorMosfet),
            "IC_DIGITAL" => Some(Self::IcDigital),
            "IC_ANALOG" | "IC_ANALOGUE" => Some(Self::IcAnalog),
            "CONNECTOR" => Some(Self::Connector),
            "CRYSTAL_OSCILLATOR" | "CRYSTAL" | "OSCILLATOR" => Some(Self::CrystalOscillator),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentClass {
    type Err = FmedaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| FmedaError::unknown_class(s.trim()))
    }
}

impl TryFrom<String> for ComponentClass {
    type Error = FmedaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentClass> for String {
    fn from(value: ComponentClass) -> Self {
        value.name().to_string()
    }
}

/// One BOM line as delivered by the ingestion layer, unvalidated.
///
/// Column aliases accept the spreadsheet headers used by existing BOM
/// exports (`Designator`, `Component_Class`, `Base_FIT`, ...). Designator
/// and sheet fields may hold comma-separated lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomRow {
    /// Reference designator(s), e.g. `R1` or `R1_1, R1_2`.
    #[serde(default, alias = "Designator")]
    pub designator: Option<String>,

    /// Component class name.
    #[serde(default, alias = "Component_Class", alias = "Component_Type")]
    pub class: Option<String>,

    /// Reference failure rate at the reference temperature (FIT).
    #[serde(default, alias = "Base_FIT", alias = "lambda_ref")]
    pub reference_fit: Option<String>,

    /// Footprint name, used to look up FIT and class in the library.
    #[serde(default, alias = "Footprint")]
    pub footprint: Option<String>,

    /// Operating temperature (°C).
    #[serde(default, alias = "Local_Temp", alias = "temperature")]
    pub temperature_c: Option<String>,

    /// Number of identical instances.
    #[serde(default, alias = "Quantity")]
    pub quantity: Option<String>,

    /// Schematic sheet(s) the component belongs to.
    #[serde(default, alias = "SheetNumber", alias = "Sheet")]
    pub sheet: Option<String>,
}

impl BomRow {
    /// Creates a row with a designator and sheet; other fields are blank.
    #[must_use]
    pub fn new(designator: &str, sheet: &str) -> Self {
        Self {
            designator: Some(designator.to_string()),
            sheet: Some(sheet.to_string()),
            ..Self::default()
        }
    }

    /// Sets the component class.
    #[must_use]
    pub fn with_class(mut self, class: impl fmt::Display) -> Self {
        self.class = Some(class.to_string());
        self
    }

    /// Sets the reference FIT.
    #[must_use]
    pub fn with_reference_fit(mut self, fit: f64) -> Self {
        self.reference_fit = Some(fit.to_string());
        self
    }

    /// Sets the footprint.
    #[must_use]
    pub fn with_footprint(mut self, footprint: &str) -> Self {
        self.footprint = Some(footprint.to_string());
        self
    }

    /// Sets the operating temperature from a raw cell value.
    #[must_use]
    pub fn with_temperature(mut self, temperature: &str) -> Self {
        self.temperature_c = Some(temperature.to_string());
        self
    }

    /// Sets the quantity.
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }

    /// Sheets this row is assigned to, in listed order.
    ///
    /// A blank sheet field yields [`UNASSIGNED_SHEET`].
    #[must_use]
    pub fn sheets(&self) -> Vec<String> {
        let sheets = split_list(self.sheet.as_deref());
        if sheets.is_empty() {
            vec![UNASSIGNED_SHEET.to_string()]
        } else {
            sheets
        }
    }

    /// Validates the row into components placed on `sheet`.
    ///
    /// `row` is the one-based BOM row number used in error messages.
    /// `fallback_temperature_c` applies when the temperature cell is blank.
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::MalformedComponentRow`] for missing or
    /// unparsable fields and [`FmedaError::UnknownComponentClass`] for a
    /// class name that is not recognised or has no library profile.
    pub fn to_components(
        &self,
        row: usize,
        sheet: &str,
        library: &ComponentLibrary,
        fallback_temperature_c: Option<f64>,
    ) -> FmedaResult<Vec<Component>> {
        if sheet == UNASSIGNED_SHEET {
            return Err(FmedaError::malformed_row(row, "missing sheet"));
        }

        let designators = split_list(self.designator.as_deref());
        if designators.is_empty() {
            return Err(FmedaError::malformed_row(row, "missing designator"));
        }

        let footprint = non_blank(self.footprint.as_deref()).and_then(|fp| library.footprint(fp));

        let class = match non_blank(self.class.as_deref()) {
            Some(name) => name.parse::<ComponentClass>()?,
            None => footprint
                .map(|entry| entry.class)
                .ok_or_else(|| FmedaError::malformed_row(row, "missing component class"))?,
        };
        let profile = library.profile(class)?;

        let reference_fit = match non_blank(self.reference_fit.as_deref()) {
            Some(text) => parse_number(row, "reference FIT", text)?,
            None => footprint
                .map(|entry| entry.base_fit)
                .or(profile.reference_fit)
                .ok_or_else(|| FmedaError::malformed_row(row, "missing reference FIT"))?,
        };

        let temperature_c = match non_blank(self.temperature_c.as_deref()) {
            Some(text) => parse_number(row, "temperature", text)?,
            None => fallback_temperature_c
                .ok_or_else(|| FmedaError::malformed_row(row, "missing temperature"))?,
        };

        let quantity = match non_blank(self.quantity.as_deref()) {
            Some(text) => parse_quantity(row, text)?,
            None => 1,
        };

        if designators.len() > 1 {
            let listed = designators.len();
            if non_blank(self.quantity.as_deref()).is_some() && quantity as usize != listed {
                return Err(FmedaError::malformed_row(
                    row,
                    format!("quantity {quantity} does not match {listed} listed designators"),
                ));
            }
            return Ok(designators
                .into_iter()
                .map(|designator| Component {
                    designator,
                    class,
                    reference_fit,
                    temperature_c,
                    quantity: 1,
                    sheet: sheet.to_string(),
                })
                .collect());
        }

        Ok(vec![Component {
            designator: designators.into_iter().next().unwrap_or_default(),
            class,
            reference_fit,
            temperature_c,
            quantity,
            sheet: sheet.to_string(),
        }])
    }
}

/// A validated BOM instance on one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Reference designator.
    pub designator: String,
    /// Component class.
    pub class: ComponentClass,
    /// Reference failure rate λ_ref (FIT).
    pub reference_fit: f64,
    /// Operating temperature (°C).
    pub temperature_c: f64,
    /// Number of identical instances.
    pub quantity: u32,
    /// Schematic sheet.
    pub sheet: String,
}

impl Component {
    /// Creates a single-instance component.
    #[must_use]
    pub fn new(
        designator: impl Into<String>,
        class: ComponentClass,
        reference_fit: f64,
        temperature_c: f64,
        sheet: impl Into<String>,
    ) -> Self {
        Self {
            designator: designator.into(),
            class,
            reference_fit,
            temperature_c,
            quantity: 1,
            sheet: sheet.into(),
        }
    }
}

/// Splits a comma-separated cell into trimmed, non-empty entries.
fn split_list(cell: Option<&str>) -> Vec<String> {
    cell.map(|text| {
        text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Trimmed cell text, or `None` for a missing or blank cell.
pub(crate) fn non_blank(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(row: usize, field: &str, text: &str) -> FmedaResult<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FmedaError::malformed_row(row, format!("{field} '{text}' is not a number")))
}

fn parse_quantity(row: usize, text: &str) -> FmedaResult<u32> {
    text.parse::<u32>()
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            FmedaError::malformed_row(row, format!("quantity '{text}' is not a positive integer"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> ComponentLibrary {
        ComponentLibrary::builtin()
    }

    #[test]
    fn class_from_string() {
        assert_eq!(
            ComponentClass::from_str_loose("Resistor"),
            Some(ComponentClass::Resistor)
        );
        assert_eq!(
            ComponentClass::from_str_loose("ic digital"),
            Some(ComponentClass::IcDigital)
        );
        assert_eq!(
            ComponentClass::from_str_loose("Transistor-MOSFET"),
            Some(ComponentClass::TransistorMosfet)
        );
        assert_eq!(ComponentClass::from_str_loose("Relay"), None);
    }

    #[test]
    fn class_names_round_trip() {
        for class in ComponentClass::ALL {
            assert_eq!(ComponentClass::from_str_loose(class.name()), Some(class));
        }
    }

    #[test]
    fn unknown_class_error() {
        let err = "Relay".parse::<ComponentClass>().unwrap_err();
        assert!(matches!(err, FmedaError::UnknownComponentClass { ref class } if class == "Relay"));
    }

    #[test]
    fn single_row_to_component() {
        let row = BomRow::new("R1", "4.1.1")
            .with_class("Resistor")
            .with_reference_fit(10.0)
            .with_temperature("85")
            .with_quantity(2);
        let components = row.to_components(1, "4.1.1", &library(), None).unwrap();
        assert_eq!(components.len(), 1);
        let c = &components[0];
        assert_eq!(c.designator, "R1");
        assert_eq!(c.class, ComponentClass::Resistor);
        assert!((c.reference_fit - 10.0).abs() < f64::EPSILON);
        assert!((c.temperature_c - 85.0).abs() < f64::EPSILON);
        assert_eq!(c.quantity, 2);
        assert_eq!(c.sheet, "4.1.1");
    }

    #[test]
    fn designator_list_expands() {
        let row = BomRow::new("R1_1, R1_2,R1_3", "4.1.1")
            .with_class("Resistor")
            .with_reference_fit(1.2)
            .with_temperature("65");
        let components = row.to_components(1, "4.1.1", &library(), None).unwrap();
        let names: Vec<&str> = components.iter().map(|c| c.designator.as_str()).collect();
        assert_eq!(names, vec!["R1_1", "R1_2", "R1_3"]);
        assert!(components.iter().all(|c| c.quantity == 1));
    }

    #[test]
    fn class_without_profile_is_unknown_before_fit_lookup() {
        let row = BomRow::new("Q1", "1")
            .with_class("Transistor_Bipolar")
            .with_temperature("40");
        let err = row.to_components(1, "1", &library(), None).unwrap_err();
        assert!(matches!(err, FmedaError::UnknownComponentClass { .. }), "{err}");
    }

    #[test]
    fn quantity_must_match_designator_list() {
        let row = BomRow::new("R1, R2", "1")
            .with_class("Resistor")
            .with_reference_fit(1.0)
            .with_temperature("40")
            .with_quantity(3);
        let err = row.to_components(4, "1", &library(), None).unwrap_err();
        assert!(matches!(err, FmedaError::MalformedComponentRow { row: 4, .. }));
    }

    #[test]
    fn sheet_list_splits() {
        let row = BomRow::new("R1", "4.1.1, 4.2.1");
        assert_eq!(row.sheets(), vec!["4.1.1".to_string(), "4.2.1".to_string()]);
        let blank = BomRow::new("R1", "  ");
        assert_eq!(blank.sheets(), vec![UNASSIGNED_SHEET.to_string()]);
    }

    #[test]
    fn non_numeric_temperature_is_malformed() {
        let row = BomRow::new("R1", "1")
            .with_class("Resistor")
            .with_reference_fit(1.0)
            .with_temperature("N/A");
        let err = row.to_components(2, "1", &library(), Some(40.0)).unwrap_err();
        assert!(err.to_string().contains("temperature 'N/A' is not a number"));
    }

    #[test]
    fn blank_temperature_uses_fallback() {
        let row = BomRow::new("R1", "1")
            .with_class("Resistor")
            .with_reference_fit(1.0);
        let components = row.to_components(1, "1", &library(), Some(70.0)).unwrap();
        assert!((components[0].temperature_c - 70.0).abs() < f64::EPSILON);
        assert!(row.to_components(1, "1", &library(), None).is_err());
    }

    #[test]
    fn missing_class_is_malformed() {
        let row = BomRow::new("X1", "1").with_reference_fit(1.0).with_temperature("40");
        let err = row.to_components(7, "1", &library(), None).unwrap_err();
        assert!(matches!(err, FmedaError::MalformedComponentRow { row: 7, .. }));
    }

    #[test]
    fn footprint_supplies_fit_and_class() {
        let mut lib = library();
        lib.insert_footprint("RESC0402L", 1.2, ComponentClass::Resistor)
            .unwrap();
        let row = BomRow::new("R1", "1")
            .with_footprint("RESC0402L")
            .with_temperature("40");
        let components = row.to_components(1, "1", &lib, None).unwrap();
        assert_eq!(components[0].class, ComponentClass::Resistor);
        assert!((components[0].reference_fit - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn unassigned_sheet_is_malformed() {
        let row = BomRow::new("R1", "")
            .with_class("Resistor")
            .with_reference_fit(1.0)
            .with_temperature("40");
        assert!(row.to_components(1, UNASSIGNED_SHEET, &library(), None).is_err());
    }
}
