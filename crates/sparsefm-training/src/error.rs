//! Errors raised by the training loop.

use sparsefm_core::FmError;
use sparsefm_model::ModelError;
use sparsefm_optimizer::OptimizerError;
use thiserror::Error;

use crate::hooks::HookError;

/// Errors that abort a training run.
#[derive(Debug, Error)]
pub enum TrainError {
    /// An entry could not be encoded (e.g. a key outside its field).
    #[error("Failed to encode entry {entry}: {source}")]
    Encoding {
        /// Position of the entry in the interaction tensor.
        entry: usize,
        /// The underlying encoding error.
        #[source]
        source: FmError,
    },

    /// The model could not be built.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The optimizer could not be built.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// A trainer setting is invalid or inconsistent with the data.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The error or the epoch loss became NaN or infinite.
    #[error("Numeric divergence at iteration {iteration} (entry {entry:?}): value {value}")]
    NumericDivergence {
        /// 1-based iteration in which divergence was detected.
        iteration: usize,
        /// Entry whose prediction error was non-finite; `None` when the
        /// epoch loss itself was non-finite.
        entry: Option<usize>,
        /// The offending value.
        value: f64,
    },

    /// A hook failed.
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),
}

impl TrainError {
    /// Returns true for errors detected while validating settings, before
    /// any parameter was touched.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            TrainError::Config(_)
                | TrainError::Model(ModelError::InvalidConfig { .. })
                | TrainError::Model(ModelError::Core(FmError::ConfigError { .. }))
                | TrainError::Optimizer(_)
        )
    }
}

/// Result type for training operations.
pub type TrainResult<T> = Result<T, TrainError>;
