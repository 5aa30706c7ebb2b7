//! Error types for the stampede risk pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, scoring or training
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("data file not found: {}", path.display())]
    MissingDataFile { path: PathBuf },

    #[error("malformed record at row {row}: field {field} has invalid value {value:?}")]
    MalformedRecord {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("unexpected CSV header: expected {expected:?}, found {found:?}")]
    InvalidHeader {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RiskError {
    /// Shorthand for a malformed field
    pub fn malformed(row: usize, field: &'static str, value: impl Into<String>) -> Self {
        RiskError::MalformedRecord {
            row,
            field,
            value: value.into(),
        }
    }
}

/// Result type alias for pipeline operations
pub type RiskResult<T> = Result<T, RiskError>;
