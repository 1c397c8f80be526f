//! Error types for model loading and inference.

use thiserror::Error;

/// Errors raised while loading frozen parameters or running the model
#[derive(Error, Debug)]
pub enum ModelError {
    /// Parameters are missing or inconsistent with the declared shapes
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    /// Two operands of a product disagree on a dimension
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model file: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn mismatch(context: impl Into<String>, expected: usize, found: usize) -> Self {
        ModelError::DimensionMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
