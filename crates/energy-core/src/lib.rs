//! Shared types and pure helpers for the energy bill pipeline.
//!
//! Holds the record and bucket models, the error type, timestamp layouts and
//! calendar rules, hourly cost derivation, number formatting and the CLI
//! settings.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{EnergyError, Result};
