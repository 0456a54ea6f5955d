//! Safety-mechanism rules.
//!
//! A rule states which failure modes a diagnostic covers and with what
//! diagnostic coverage. Each selector (sheet, class, designator, mode) is
//! optional; an absent selector, `ALL` or `*` matches anything. When several
//! rules match, the most specific one wins, and among equally specific
//! rules the one listed last wins.
//!
//! A rule may also reclassify the modes it matches, e.g. mark a resistor's
//! drift as safe on a sheet where it cannot violate a safety goal.

use serde::{Deserialize, Serialize};

use crate::fmeda::component::{Component, ComponentClass};
use crate::fmeda::error::{FmedaError, FmedaResult};
use crate::fmeda::modes::{FailureMode, FaultClass};

/// A diagnostic rule covering a set of failure modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafetyMechanism {
    /// Mechanism name, for reports and logs.
    #[serde(default)]
    pub name: String,

    /// Sheet selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,

    /// Component class selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ComponentClass>,

    /// Designator selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designator: Option<String>,

    /// Failure-mode selector (case-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Diagnostic coverage in [0, 1].
    #[serde(default)]
    pub coverage: f64,

    /// Classification applied to matched modes instead of the table's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<FaultClass>,
}

impl SafetyMechanism {
    /// Creates a rule matching everything with the given coverage.
    #[must_use]
    pub fn new(name: impl Into<String>, coverage: f64) -> Self {
        Self {
            name: name.into(),
            sheet: None,
            class: None,
            designator: None,
            mode: None,
            coverage,
            classification: None,
        }
    }

    /// Restricts the rule to a sheet.
    #[must_use]
    pub fn on_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Restricts the rule to a component class.
    #[must_use]
    pub const fn for_class(mut self, class: ComponentClass) -> Self {
        self.class = Some(class);
        self
    }

    /// Restricts the rule to a designator.
    #[must_use]
    pub fn for_designator(mut self, designator: impl Into<String>) -> Self {
        self.designator = Some(designator.into());
        self
    }

    /// Restricts the rule to a failure mode.
    #[must_use]
    pub fn for_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Reclassifies matched modes.
    #[must_use]
    pub const fn reclassify(mut self, classification: FaultClass) -> Self {
        self.classification = Some(classification);
        self
    }

    fn validate(&self) -> FmedaResult<()> {
        if !self.coverage.is_finite() || !(0.0..=1.0).contains(&self.coverage) {
            return Err(FmedaError::invalid_input(
                "coverage",
                format!(
                    "mechanism '{}' coverage {} is not a probability in [0, 1]",
                    self.name, self.coverage
                ),
            ));
        }
        Ok(())
    }

    /// Drops wildcard selectors so matching only sees real constraints.
    fn normalise(mut self) -> Self {
        self.sheet = selector(self.sheet);
        self.designator = selector(self.designator);
        self.mode = selector(self.mode);
        self
    }

    fn specificity(&self) -> usize {
        usize::from(self.sheet.is_some())
            + usize::from(self.class.is_some())
            + usize::from(self.designator.is_some())
            + usize::from(self.mode.is_some())
    }

    fn matches(&self, component: &Component, mode: &FailureMode) -> bool {
        self.sheet.as_deref().map_or(true, |s| s == component.sheet)
            && self.class.map_or(true, |c| c == component.class)
            && self
                .designator
                .as_deref()
                .map_or(true, |d| d == component.designator)
            && self
                .mode
                .as_deref()
                .map_or(true, |m| m.eq_ignore_ascii_case(&mode.name))
    }
}

fn selector(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "*" && !v.eq_ignore_ascii_case("ALL"))
}

/// Outcome of a mechanism lookup for one failure mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage<'a> {
    /// Diagnostic coverage; 0 when no mechanism applies.
    pub coverage: f64,
    /// Effective classification of the mode.
    pub classification: FaultClass,
    /// The rule that matched, if any.
    pub mechanism: Option<&'a SafetyMechanism>,
}

/// Validated, read-only rule set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MechanismSet {
    mechanisms: Vec<SafetyMechanism>,
}

impl MechanismSet {
    /// Creates an empty rule set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            mechanisms: Vec::new(),
        }
    }

    /// Validates and stores rules.
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::InvalidInput`] for coverage outside [0, 1].
    pub fn new(mechanisms: Vec<SafetyMechanism>) -> FmedaResult<Self> {
        let mut set = Self::empty();
        for mechanism in mechanisms {
            set.push(mechanism)?;
        }
        Ok(set)
    }

    /// Validates and appends one rule.
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::InvalidInput`] for coverage outside [0, 1].
    pub fn push(&mut self, mechanism: SafetyMechanism) -> FmedaResult<()> {
        mechanism.validate()?;
        self.mechanisms.push(mechanism.normalise());
        Ok(())
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }

    /// Iterates over the rules.
    pub fn iter(&self) -> std::slice::Iter<'_, SafetyMechanism> {
        self.mechanisms.iter()
    }

    /// Finds the coverage that applies to `mode` of `component`.
    #[must_use]
    pub fn lookup(&self, component: &Component, mode: &FailureMode) -> Coverage<'_> {
        let best = self
            .mechanisms
            .iter()
            .filter(|m| m.matches(component, mode))
            .max_by_key(|m| m.specificity());

        best.map_or(
            Coverage {
                coverage: 0.0,
                classification: mode.classification,
                mechanism: None,
            },
            |m| Coverage {
                coverage: m.coverage,
                classification: m.classification.unwrap_or(mode.classification),
                mechanism: Some(m),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor(sheet: &str) -> Component {
        Component::new("R1", ComponentClass::Resistor, 10.0, 40.0, sheet)
    }

    fn open() -> FailureMode {
        FailureMode::new("Open Circuit", 0.7)
    }

    #[test]
    fn no_rule_means_zero_coverage() {
        let set = MechanismSet::empty();
        let cov = set.lookup(&resistor("1"), &open());
        assert!(cov.coverage.abs() < f64::EPSILON);
        assert_eq!(cov.classification, FaultClass::SinglePoint);
        assert!(cov.mechanism.is_none());
    }

    #[test]
    fn specific_rule_beats_sheet_wide_rule() {
        let set = MechanismSet::new(vec![
            SafetyMechanism::new("voltage monitor", 0.6).on_sheet("1"),
            SafetyMechanism::new("open-load check", 0.99)
                .on_sheet("1")
                .for_class(ComponentClass::Resistor)
                .for_mode("open circuit"),
            SafetyMechanism::new("watchdog", 0.9).on_sheet("ALL"),
        ])
        .unwrap();
        let cov = set.lookup(&resistor("1"), &open());
        assert!((cov.coverage - 0.99).abs() < f64::EPSILON);
        assert_eq!(cov.mechanism.unwrap().name, "open-load check");

        let drift = FailureMode::new("Drift", 0.3);
        let cov = set.lookup(&resistor("1"), &drift);
        assert!((cov.coverage - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn wildcard_selectors_match_everything() {
        let set = MechanismSet::new(vec![SafetyMechanism::new("global", 0.5)
            .on_sheet("*")
            .for_mode("ALL")])
        .unwrap();
        let cov = set.lookup(&resistor("7"), &open());
        assert!((cov.coverage - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn later_rule_wins_tie() {
        let set = MechanismSet::new(vec![
            SafetyMechanism::new("first", 0.2).on_sheet("1"),
            SafetyMechanism::new("second", 0.4).on_sheet("1"),
        ])
        .unwrap();
        let cov = set.lookup(&resistor("1"), &open());
        assert_eq!(cov.mechanism.unwrap().name, "second");
    }

    #[test]
    fn rule_on_other_sheet_does_not_apply() {
        let set = MechanismSet::new(vec![SafetyMechanism::new("m", 0.9).on_sheet("2")]).unwrap();
        let cov = set.lookup(&resistor("1"), &open());
        assert!(cov.mechanism.is_none());
    }

    #[test]
    fn reclassification() {
        let set = MechanismSet::new(vec![SafetyMechanism::new("not safety related", 0.0)
            .for_class(ComponentClass::Resistor)
            .reclassify(FaultClass::Safe)])
        .unwrap();
        let cov = set.lookup(&resistor("1"), &open());
        assert_eq!(cov.classification, FaultClass::Safe);
    }

    #[test]
    fn designator_selector() {
        let set = MechanismSet::new(vec![SafetyMechanism::new("m", 0.9).for_designator("R2")]).unwrap();
        assert!(set.lookup(&resistor("1"), &open()).mechanism.is_none());
    }

    #[test]
    fn reject_coverage_out_of_range() {
        assert!(MechanismSet::new(vec![SafetyMechanism::new("bad", 99.0)]).is_err());
        assert!(MechanismSet::new(vec![SafetyMechanism::new("bad", -0.1)]).is_err());
        assert!(MechanismSet::new(vec![SafetyMechanism::new("nan", f64::NAN)]).is_err());
    }
}
