use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the energy bill pipeline.
///
/// Only whole-input failures end up here. Individual malformed rows are
/// reported through the parser's rejected-row list instead.
#[derive(Error, Debug)]
pub enum EnergyError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed before any rows could be examined.
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A required column could not be located in the header row.
    #[error("Missing required column in {source_name} data: {column}")]
    MissingColumn {
        source_name: &'static str,
        column: &'static str,
    },

    /// The input contained no header row at all.
    #[error("No data in {0} input")]
    EmptyInput(&'static str),

    /// A date bound given on the command line could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A join policy name is not one of the recognised policies.
    #[error("Invalid join policy: {0}")]
    InvalidJoinPolicy(String),

    /// A granularity name is not one of the recognised periods.
    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A report could not be serialised to JSON.
    #[error("Failed to serialise JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the energy crates.
pub type Result<T> = std::result::Result<T, EnergyError>;
