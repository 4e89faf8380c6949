//! Engine error types.
//!
//! Numeric edge cases never reach this enum; they resolve to neutral values
//! inside the calculators. Only missing data and bad caller input do.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("data unavailable at {}: {source}", path.display())]
    DataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{dataset} dataset is missing required columns: {}", missing.join(", "))]
    SchemaMismatch {
        dataset: &'static str,
        missing: Vec<String>,
    },

    #[error("malformed row in {} at line {line}: {message}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
