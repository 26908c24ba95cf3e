//! Data pipeline for the energy bill report.
//!
//! Parses the consumption and spot-price exports, aligns them on the hour,
//! derives the hourly bill and aggregates the result over calendar periods.

pub mod aggregator;
pub mod aligner;
pub mod analysis;
pub mod reader;

pub use energy_core as core;
