//! Structural errors: a document or table that cannot be turned into a
//! `Configuration` at all. Data-quality problems are not errors, see
//! `crate::diagnostics`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Every missing or malformed field found while building the typed
    /// document, reported together.
    #[error("invalid configuration:\n  {}", .problems.join("\n  "))]
    Invalid { problems: Vec<String> },

    #[error("failed to read or write sample sheet: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("failed to write spreadsheet: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("sample sheet is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unsupported table format: '{0}' (expected .csv, .tsv, .txt or .xlsx)")]
    UnsupportedFormat(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
