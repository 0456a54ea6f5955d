//! Error types for the configuration and input layers.
//!
//! Calculation errors live in [`crate::fmeda::error`]. The types here cover
//! the files the command-line tool reads before a run starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::fmeda::error::FmedaError;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors that can occur while reading BOM, mechanism, sheet or library files.
#[derive(Error, Debug)]
pub enum InputError {
    /// Input file could not be read.
    #[error("failed to read input file: {path}")]
    ReadError {
        /// Path to the input file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// CSV input could not be parsed.
    #[error("failed to parse CSV in {path}")]
    CsvError {
        /// Path to the input file.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// JSON input could not be parsed.
    #[error("failed to parse JSON in {path}")]
    JsonError {
        /// Path to the input file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A record parsed but holds invalid values.
    #[error("invalid record {record} in {path}")]
    InvalidRecord {
        /// Path to the input file.
        path: PathBuf,
        /// One-based data record number.
        record: usize,
        /// The validation error.
        #[source]
        source: FmedaError,
    },
}
