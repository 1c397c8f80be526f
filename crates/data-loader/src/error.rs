//! Error types for the data-loader crate.
//!
//! Every artifact problem surfaces here at startup; nothing in this crate
//! runs per request.

use thiserror::Error;

/// Errors that can occur while reading or writing artifact files
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// Artifact file is missing from the artifact directory
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in a data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// Expected number of fields in a line doesn't match actual
    #[error("Expected {expected} fields but found {found} in line {line} of {file}")]
    FieldCountMismatch {
        file: String,
        expected: usize,
        found: usize,
        line: usize,
    },

    /// Artifacts disagree with each other (e.g. adjacency entry outside the node range)
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
