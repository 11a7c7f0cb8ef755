//! Error types for model construction and parameter access.

use sparsefm_core::FmError;
use thiserror::Error;

/// Errors that can occur while building or querying a model.
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    /// A feature-space error (field map, encoding).
    #[error(transparent)]
    Core(#[from] FmError),

    /// A model hyperparameter is invalid.
    #[error("Configuration error: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A parameter buffer does not match the store's shape.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected `(rows, cols)`.
        expected: (usize, usize),
        /// Provided `(rows, cols)`.
        actual: (usize, usize),
    },
}

impl ModelError {
    /// Convenience constructor for [`ModelError::InvalidConfig`].
    pub fn config(message: impl Into<String>) -> Self {
        ModelError::InvalidConfig {
            message: message.into(),
        }
    }
}

/// A specialized Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
