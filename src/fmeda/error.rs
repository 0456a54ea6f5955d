//! Error types for FMEDA calculations.

use thiserror::Error;

/// Result type for FMEDA operations.
pub type FmedaResult<T> = Result<T, FmedaError>;

/// Errors that can occur while computing FMEDA metrics.
///
/// A metric with a zero denominator is not an error; see
/// [`MetricValue::NotApplicable`](crate::fmeda::metrics::MetricValue).
#[derive(Debug, Error)]
pub enum FmedaError {
    /// A value is outside its physical range (temperature at or below
    /// absolute zero, negative FIT, coverage outside [0, 1], ...).
    #[error("Invalid input '{field}': {message}")]
    InvalidInput {
        /// Name of the offending quantity.
        field: String,
        /// Description of what's wrong.
        message: String,
    },

    /// No failure-mode table exists for the component class.
    #[error("Unknown component class: {class}")]
    UnknownComponentClass {
        /// Class name as given.
        class: String,
    },

    /// A BOM row is missing a required field or holds an unparsable value.
    #[error("Malformed component row {row}: {message}")]
    MalformedComponentRow {
        /// One-based row number in the BOM.
        row: usize,
        /// Description of what's wrong.
        message: String,
    },

    /// The component library failed load-time validation.
    #[error("Invalid component library: {message}")]
    InvalidLibrary {
        /// Description of what's wrong.
        message: String,
    },

    /// Processing of one schematic sheet was aborted.
    #[error("Sheet '{sheet}' could not be processed: {source}")]
    SheetProcessing {
        /// Sheet identifier.
        sheet: String,
        /// The error that aborted the sheet.
        #[source]
        source: Box<FmedaError>,
    },
}

impl FmedaError {
    /// Creates an invalid input error.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown component class error.
    pub fn unknown_class(class: impl Into<String>) -> Self {
        Self::UnknownComponentClass {
            class: class.into(),
        }
    }

    /// Creates a malformed row error.
    pub fn malformed_row(row: usize, message: impl Into<String>) -> Self {
        Self::MalformedComponentRow {
            row,
            message: message.into(),
        }
    }

    /// Creates an invalid library error.
    pub fn invalid_library(message: impl Into<String>) -> Self {
        Self::InvalidLibrary {
            message: message.into(),
        }
    }

    /// Wraps an error as the cause of a failed sheet.
    pub fn sheet(sheet: impl Into<String>, source: Self) -> Self {
        Self::SheetProcessing {
            sheet: sheet.into(),
            source: Box::new(source),
        }
    }
}
