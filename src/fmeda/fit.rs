//! Temperature derating of failure rates per SN 29500.
//!
//! SN 29500 states reference failure rates at a reference temperature and
//! scales them to the operating temperature with the Arrhenius law:
//!
//! ```text
//! λ_real = λ_ref · π_T
//! π_T    = exp[ (Ea / k_B) · (1/T_ref − 1/T_op) ]
//! ```
//!
//! Temperatures are given in °C and converted to Kelvin internally.
//!
//! # Example
//!
//! ```
//! use fmeda_calc::fmeda::fit::derate;
//!
//! // 2 FIT at 40 °C, operated at 85 °C, Ea = 0.4 eV
//! let fit = derate(2.0, 40.0, 85.0, 0.4).unwrap();
//! assert!((fit - 12.88).abs() < 0.01);
//! ```

use crate::fmeda::component::ComponentClass;
use crate::fmeda::error::{FmedaError, FmedaResult};

/// Boltzmann constant (eV/K).
pub const BOLTZMANN_EV_PER_K: f64 = 8.617e-5;

/// Offset between the Celsius and Kelvin scales.
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// SN 29500 reference temperature (°C).
pub const DEFAULT_REFERENCE_TEMPERATURE_C: f64 = 40.0;

/// Converts °C to K.
///
/// # Errors
///
/// Returns [`FmedaError::InvalidInput`] for non-finite values or values at
/// or below absolute zero.
pub fn celsius_to_kelvin(field: &str, celsius: f64) -> FmedaResult<f64> {
    let kelvin = celsius + CELSIUS_TO_KELVIN;
    if !kelvin.is_finite() || kelvin <= 0.0 {
        return Err(FmedaError::invalid_input(
            field,
            format!("{celsius} °C is at or below absolute zero"),
        ));
    }
    Ok(kelvin)
}

/// Arrhenius acceleration factor π_T.
///
/// # Errors
///
/// Returns [`FmedaError::InvalidInput`] for a non-physical temperature or a
/// negative or non-finite activation energy.
pub fn acceleration_factor(
    reference_c: f64,
    operating_c: f64,
    activation_energy_ev: f64,
) -> FmedaResult<f64> {
    if !activation_energy_ev.is_finite() || activation_energy_ev < 0.0 {
        return Err(FmedaError::invalid_input(
            "activation_energy_ev",
            format!("{activation_energy_ev} eV must be finite and non-negative"),
        ));
    }

    let t_ref = celsius_to_kelvin("reference_temperature_c", reference_c)?;
    let t_op = celsius_to_kelvin("temperature_c", operating_c)?;

    let exponent = (activation_energy_ev / BOLTZMANN_EV_PER_K) * (t_ref.recip() - t_op.recip());
    Ok(exponent.exp())
}

/// Derates a reference failure rate to the operating temperature.
///
/// Equal temperatures return `reference_fit` unchanged.
///
/// # Errors
///
/// Returns [`FmedaError::InvalidInput`] for a negative or non-finite FIT or
/// any error from [`acceleration_factor`].
pub fn derate(
    reference_fit: f64,
    reference_c: f64,
    operating_c: f64,
    activation_energy_ev: f64,
) -> FmedaResult<f64> {
    if !reference_fit.is_finite() || reference_fit < 0.0 {
        return Err(FmedaError::invalid_input(
            "reference_fit",
            format!("{reference_fit} FIT must be finite and non-negative"),
        ));
    }
    let pi_t = acceleration_factor(reference_c, operating_c, activation_energy_ev)?;
    Ok(reference_fit * pi_t)
}

/// Derating model bound to a configured reference temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRateModel {
    reference_temperature_c: f64,
}

impl Default for FailureRateModel {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_TEMPERATURE_C)
    }
}

impl FailureRateModel {
    /// Creates a model with the given reference temperature (°C).
    #[must_use]
    pub const fn new(reference_temperature_c: f64) -> Self {
        Self {
            reference_temperature_c,
        }
    }

    /// Reference temperature (°C).
    #[must_use]
    pub const fn reference_temperature_c(&self) -> f64 {
        self.reference_temperature_c
    }

    /// Derates `reference_fit` of a part of `class` to `operating_c`.
    ///
    /// # Errors
    ///
    /// Returns [`FmedaError::InvalidInput`] with the class named in the
    /// message when the inputs are not physical.
    pub fn derate(
        &self,
        reference_fit: f64,
        operating_c: f64,
        activation_energy_ev: f64,
        class: ComponentClass,
    ) -> FmedaResult<f64> {
        derate(
            reference_fit,
            self.reference_temperature_c,
            operating_c,
            activation_energy_ev,
        )
        .map_err(|err| match err {
            FmedaError::InvalidInput { field, message } => {
                FmedaError::invalid_input(field, format!("{message} ({class})"))
            }
            other => other,
        })
    }
}
