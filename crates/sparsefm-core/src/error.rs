//! Error types for the sparsefm core library.
//!
//! This module defines the errors raised while building field maps and
//! encoding interaction-tensor entries into sparse feature vectors.

use thiserror::Error;

use crate::field::{FeatureIndex, FieldId};

/// The main error type for sparsefm-core operations.
#[derive(Debug, Error, PartialEq)]
pub enum FmError {
    /// A raw key lies outside its field's declared cardinality.
    #[error("Invalid key {key} for field {field} (cardinality {cardinality})")]
    InvalidFieldKey {
        /// The field the key was supplied for.
        field: FieldId,
        /// The offending raw key.
        key: usize,
        /// The declared cardinality of the field.
        cardinality: usize,
    },

    /// An entry supplied a different number of keys than there are fields.
    #[error("Field count mismatch: expected {expected}, got {actual}")]
    FieldCountMismatch {
        /// Number of fields declared by the field map.
        expected: usize,
        /// Number of keys supplied by the entry.
        actual: usize,
    },

    /// A field id outside the field map.
    #[error("Unknown field {field} (num_fields: {num_fields})")]
    UnknownField {
        /// The offending field id.
        field: FieldId,
        /// Total number of fields.
        num_fields: usize,
    },

    /// A global feature index outside `[0, p)`.
    #[error("Feature index {index} out of range (num_features: {num_features})")]
    FeatureOutOfRange {
        /// The offending feature index.
        index: FeatureIndex,
        /// Size of the feature space.
        num_features: usize,
    },

    /// A sparse vector activated the same index or field twice.
    #[error("Duplicate activation of feature {index} (field {field})")]
    DuplicateFeature {
        /// The repeated feature index.
        index: FeatureIndex,
        /// The field of the repeated feature.
        field: FieldId,
    },

    /// An entry carries a field other than the one owning its index.
    #[error("Feature {index} belongs to field {expected}, not field {actual}")]
    FieldMismatch {
        /// The feature index.
        index: FeatureIndex,
        /// The field that owns `index`.
        expected: FieldId,
        /// The field the entry claimed.
        actual: FieldId,
    },

    /// Error during configuration validation.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// A description of the configuration error.
        message: String,
    },
}

impl FmError {
    /// Convenience constructor for [`FmError::ConfigError`].
    pub fn config(message: impl Into<String>) -> Self {
        FmError::ConfigError {
            message: message.into(),
        }
    }
}

/// A specialized Result type for sparsefm-core operations.
pub type Result<T> = std::result::Result<T, FmError>;
