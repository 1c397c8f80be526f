//! Error types for the id and title lookup tables.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    /// The same external id appears twice in one mapping
    #[error("Duplicate {kind} id {id} in index mapping")]
    DuplicateId { kind: &'static str, id: u32 },

    /// Two ids map to the same dense index
    #[error("Index {index} is assigned to more than one {kind}")]
    DuplicateIndex { kind: &'static str, index: usize },

    /// Dense indices must cover `0..len` without gaps
    #[error("{kind} index {index} is out of range for {len} entries")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid match cutoff {0}: must be within [0, 1]")]
    InvalidCutoff(f64),
}

pub type Result<T> = std::result::Result<T, LookupError>;
