//! Component reference data: activation energies, mode tables and a
//! footprint FIT database.
//!
//! The library is validated when it is built or deserialised, so a missing
//! or inconsistent table is reported once at load time rather than midway
//! through an analysis. Mode fractions are normalised to sum to exactly 1.0
//! after validation.
//!
//! # File Format
//!
//! ```json
//! {
//!   "classes": {
//!     "Resistor": {
//!       "activation_energy_ev": 0.4,
//!       "reference_fit": 0.5,
//!       "modes": [
//!         { "name": "Open Circuit", "fraction": 0.6, "classification": "single_point" },
//!         { "name": "Short Circuit", "fraction": 0.1, "classification": "safe" },
//!         { "name": "Drift", "fraction": 0.3 }
//!       ]
//!     }
//!   },
//!   "footprints": {
//!     "RESC0402L": { "base_fit": 1.2, "class": "Resistor" }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::fmeda::component::ComponentClass;
use crate::fmeda::error::{FmedaError, FmedaResult};
use crate::fmeda::modes::{validate_modes, FailureMode, FRACTION_SUM_TOLERANCE};

/// Activation energy used by the built-in tables for most classes (eV).
pub const DEFAULT_ACTIVATION_ENERGY_EV: f64 = 0.4;

/// Built-in mode tables: class, activation energy (eV), (mode, fraction).
///
/// These mirror the defaults shipped with earlier FMEDA spreadsheets. They
/// are placeholders: a project must replace them with values taken from
/// IEC 61709 and SN 29500 for its parts.
const BUILTIN_TABLES: &[(ComponentClass, f64, &[(&str, f64)])] = &[
    (
        ComponentClass::Resistor,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[("Open Circuit", 0.60), ("Short Circuit", 0.10), ("Drift", 0.30)],
    ),
    (
        ComponentClass::Capacitor,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[("Short Circuit", 0.50), ("Open Circuit", 0.30), ("Drift", 0.20)],
    ),
    (
        ComponentClass::CapacitorCeramic,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[("Short Circuit", 0.70), ("Open Circuit", 0.15), ("Drift", 0.15)],
    ),
    (
        ComponentClass::CapacitorElectrolytic,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[("Short Circuit", 0.50), ("Open Circuit", 0.30), ("Drift", 0.20)],
    ),
    (
        ComponentClass::Inductor,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[("Open Circuit", 0.55), ("Short Circuit", 0.25), ("Drift", 0.20)],
    ),
    (
        ComponentClass::Diode,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[("Short Circuit", 0.50), ("Open Circuit", 0.35), ("Drift", 0.15)],
    ),
    (
        ComponentClass::TransistorMosfet,
        0.35,
        &[("Short Circuit", 0.55), ("Open Circuit", 0.30), ("Drift", 0.15)],
    ),
    (
        ComponentClass::IcDigital,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[
            ("Loss of Function", 0.50),
            ("Incorrect Output", 0.30),
            ("Short Circuit", 0.20),
        ],
    ),
    (
        ComponentClass::IcAnalog,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[("Drift", 0.40), ("Loss of Function", 0.35), ("Short Circuit", 0.25)],
    ),
    (
        ComponentClass::Connector,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[
            ("Open Circuit", 0.70),
            ("Short Circuit", 0.20),
            ("Intermittent Contact", 0.10),
        ],
    ),
    (
        ComponentClass::CrystalOscillator,
        DEFAULT_ACTIVATION_ENERGY_EV,
        &[
            ("No Oscillation", 0.60),
            ("Frequency Drift", 0.30),
            ("Short Circuit", 0.10),
        ],
    ),
];

/// Reference data for one component class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassProfile {
    /// Arrhenius activation energy (eV).
    pub activation_energy_ev: f64,

    /// Class-wide reference FIT, used when neither the BOM row nor the
    /// footprint database provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_fit: Option<f64>,

    /// Failure modes in report order.
    pub modes: Vec<FailureMode>,
}

impl ClassProfile {
    /// Creates a profile without a class-wide reference FIT.
    #[must_use]
    pub const fn new(activation_energy_ev: f64, modes: Vec<FailureMode>) -> Self {
        Self {
            activation_energy_ev,
            reference_fit: None,
            modes,
        }
    }

    fn validate(&self, class: ComponentClass) -> FmedaResult<()> {
        if !self.activation_energy_ev.is_finite() || self.activation_energy_ev < 0.0 {
            return Err(FmedaError::invalid_library(format!(
                "'{class}' activation energy {} eV must be finite and non-negative",
                self.activation_energy_ev
            )));
        }
        if let Some(fit) = self.reference_fit {
            if !fit.is_finite() || fit < 0.0 {
                return Err(FmedaError::invalid_library(format!(
                    "'{class}' reference FIT {fit} must be finite and non-negative"
                )));
            }
        }
        validate_modes(class, &self.modes, FRACTION_SUM_TOLERANCE)
    }

    fn normalise(&mut self) {
        let total: f64 = self.modes.iter().map(|m| m.fraction).sum();
        if total > 0.0 {
            for mode in &mut self.modes {
                mode.fraction /= total;
            }
        }
    }
}

/// Footprint entry of the FIT database.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FootprintEntry {
    /// Reference FIT for parts with this footprint.
    pub base_fit: f64,
    /// Component class of parts with this footprint.
    pub class: ComponentClass,
}

/// Serialised form of [`ComponentLibrary`], before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryFile {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Per-class profiles.
    pub classes: IndexMap<ComponentClass, ClassProfile>,

    /// Footprint FIT database.
    #[serde(default)]
    pub footprints: IndexMap<String, FootprintEntry>,
}

/// Validated per-class reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LibraryFile")]
pub struct ComponentLibrary {
    classes: IndexMap<ComponentClass, ClassProfile>,
    footprints: IndexMap<String, FootprintEntry>,
}

impl Default for ComponentLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<LibraryFile> for ComponentLibrary {
    type Error = FmedaError;

    fn try_from(file: LibraryFile) -> Result<Self, Self::Error> {
        let mut library = Self::empty();
        for (class, profile) in file.classes {
            library.insert_profile(class, profile)?;
        }
        for (name, entry) in file.footprints {
            library.insert_footprint(&name, entry.base_fit, entry.class)?;
        }
        Ok(library)
    }
}

impl ComponentLibrary {
    /// Creates a library with no classes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            classes: IndexMap::new(),
            footprints: IndexMap::new(),
        }
    }

    /// Creates the library from the built-in tables.
    ///
    /// Every built-in mode is classified single-point; mechanism rules
    /// reclassify modes per sheet.
    #[must_use]
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        for (class, activation_energy, modes) in BUILTIN_TABLES {
            let modes = modes
                .iter()
                .map(|(name, fraction)| FailureMode::new(*name, *fraction))
                .collect();
            let mut profile = ClassProfile::new(*activation_energy, modes);
            profile.normalise();
            library.classes.insert(*class, profile);
        }
        library
    }

    /// Parses and validates a library from JSON.
    ///
    /// # Errors
    ///
    /// Returns the JSON error, which wraps [`FmedaError::InvalidLibrary`]
    /// when the tables fail validation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Adds or replaces the profile of a class after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::InvalidLibrary`] if the profile is inconsistent.
    pub fn insert_profile(&mut self, class: ComponentClass, mut profile: ClassProfile) -> FmedaResult<()> {
        profile.validate(class)?;
        profile.normalise();
        self.classes.insert(class, profile);
        Ok(())
    }

    /// Adds or replaces a footprint entry.
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::InvalidLibrary`] for a negative or non-finite FIT.
    pub fn insert_footprint(&mut self, name: &str, base_fit: f64, class: ComponentClass) -> FmedaResult<()> {
        if !base_fit.is_finite() || base_fit < 0.0 {
            return Err(FmedaError::invalid_library(format!(
                "footprint '{name}' FIT {base_fit} must be finite and non-negative"
            )));
        }
        self.footprints
            .insert(name.trim().to_string(), FootprintEntry { base_fit, class });
        Ok(())
    }

    /// Returns the profile of a class.
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::UnknownComponentClass`] if no table exists.
    pub fn profile(&self, class: ComponentClass) -> FmedaResult<&ClassProfile> {
        self.classes
            .get(&class)
            .ok_or_else(|| FmedaError::unknown_class(class.name()))
    }

    /// Returns the activation energy of a class (eV).
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::UnknownComponentClass`] if no table exists.
    pub fn activation_energy(&self, class: ComponentClass) -> FmedaResult<f64> {
        self.profile(class).map(|p| p.activation_energy_ev)
    }

    /// Looks up a footprint in the FIT database.
    #[must_use]
    pub fn footprint(&self, name: &str) -> Option<&FootprintEntry> {
        self.footprints.get(name.trim())
    }

    /// Classes with a profile, in insertion order.
    pub fn classes(&self) -> impl Iterator<Item = ComponentClass> + '_ {
        self.classes.keys().copied()
    }

    /// Number of footprint entries.
    #[must_use]
    pub fn footprint_count(&self) -> usize {
        self.footprints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fmeda::modes::FaultClass;

    #[test]
    fn builtin_tables_validate() {
        let library = ComponentLibrary::builtin();
        for class in library.classes() {
            let profile = library.profile(class).unwrap();
            assert!(profile.validate(class).is_ok(), "{class}");
            let total: f64 = profile.modes.iter().map(|m| m.fraction).sum();
            assert!((total - 1.0).abs() < 1e-12, "{class}");
        }
    }

    #[test]
    fn builtin_has_no_bipolar_table() {
        let library = ComponentLibrary::builtin();
        assert!(library.profile(ComponentClass::TransistorBipolar).is_err());
        assert!(library.profile(ComponentClass::Resistor).is_ok());
    }

    #[test]
    fn mosfet_activation_energy() {
        let library = ComponentLibrary::builtin();
        let ea = library.activation_energy(ComponentClass::TransistorMosfet).unwrap();
        assert!((ea - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_library_json() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "classes": {
                "Resistor": {
                    "activation_energy_ev": 0.3,
                    "reference_fit": 0.5,
                    "modes": [
                        { "name": "Open", "fraction": 0.7 },
                        { "name": "Drift", "fraction": 0.3, "classification": "safe" }
                    ]
                }
            },
            "footprints": {
                "RESC0603L": { "base_fit": 1.3, "class": "resistor" }
            }
        }"#;
        let library = ComponentLibrary::from_json(json).unwrap();
        let profile = library.profile(ComponentClass::Resistor).unwrap();
        assert_eq!(profile.modes.len(), 2);
        assert_eq!(profile.modes[1].classification, FaultClass::Safe);
        assert_eq!(profile.reference_fit, Some(0.5));
        let fp = library.footprint("RESC0603L").unwrap();
        assert_eq!(fp.class, ComponentClass::Resistor);
        assert!(library.profile(ComponentClass::Diode).is_err());
    }

    #[test]
    fn reject_bad_fraction_sum_at_load() {
        let json = r#"{
            "classes": {
                "Diode": {
                    "activation_energy_ev": 0.4,
                    "modes": [
                        { "name": "Short", "fraction": 0.5 },
                        { "name": "Open", "fraction": 0.2 }
                    ]
                }
            }
        }"#;
        let err = ComponentLibrary::from_json(json).unwrap_err();
        assert!(err.to_string().contains("sum to"));
    }

    #[test]
    fn reject_unknown_class_at_load() {
        let json = r#"{ "classes": { "Relay": { "activation_energy_ev": 0.4, "modes": [] } } }"#;
        assert!(ComponentLibrary::from_json(json).is_err());
    }

    #[test]
    fn reject_negative_activation_energy() {
        let mut library = ComponentLibrary::empty();
        let profile = ClassProfile::new(-0.1, vec![FailureMode::new("Open", 1.0)]);
        assert!(library.insert_profile(ComponentClass::Resistor, profile).is_err());
    }

    #[test]
    fn fractions_within_tolerance_are_normalised() {
        let mut library = ComponentLibrary::empty();
        let profile = ClassProfile::new(
            0.4,
            vec![FailureMode::new("A", 0.333_333_5), FailureMode::new("B", 0.666_667)],
        );
        library.insert_profile(ComponentClass::Inductor, profile).unwrap();
        let total: f64 = library
            .profile(ComponentClass::Inductor)
            .unwrap()
            .modes
            .iter()
            .map(|m| m.fraction)
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
