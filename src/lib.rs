//! fmeda-calc: FMEDA calculator for ISO 26262 hardware safety analysis
//!
//! This library computes Failure Mode, Effects and Diagnostic Analysis
//! metrics for electronic designs from a bill of materials.
//!
//! # Architecture
//!
//! The calculation runs in four stages:
//!
//! - **Failure rates**: reference FIT derated to the operating temperature
//!   with the SN 29500 Arrhenius model
//! - **Failure modes**: FIT split across each class's IEC 61709 modes
//! - **Architectural metrics**: per-mode FIT routed through safety-mechanism
//!   coverage into fault buckets, finalised as SPFM, LFM and an ASIL verdict
//! - **Orchestration**: BOM rows grouped by schematic sheet, sheets processed
//!   independently and in parallel
//!
//! Normative tables (failure rates, mode distributions, activation energies)
//! are input data supplied through [`fmeda::ComponentLibrary`].
//!
//! # Modules
//!
//! - [`fmeda`] — Calculation core
//! - [`config`] — Configuration loading and validation
//! - [`input`] — CSV and JSON input files
//! - [`error`] — Configuration and input error types

pub mod config;
pub mod error;
pub mod fmeda;
pub mod input;
