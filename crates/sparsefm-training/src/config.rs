//! Trainer configuration.

use serde::{Deserialize, Serialize};
use sparsefm_model::{InteractionKind, ModelConfig};
use sparsefm_optimizer::OptimizerConfig;

use crate::convergence::ConvergencePolicy;
use crate::error::{TrainError, TrainResult};

/// Default iteration budget.
pub const DEFAULT_NUM_ITERATIONS: usize = 100;

/// Configuration for a [`Trainer`](crate::Trainer).
///
/// # Examples
///
/// ```
/// use sparsefm_training::{ConvergencePolicy, TrainerConfig};
///
/// let config = TrainerConfig::fm_ftrl(8, 0.1, 1.0)
///     .with_num_iterations(50)
///     .with_convergence(ConvergencePolicy::relative(1e-4));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Model shape and initialization.
    pub model: ModelConfig,
    /// Update strategy.
    pub optimizer: OptimizerConfig,
    /// Maximum number of passes over the data.
    pub num_iterations: usize,
    /// Early-stopping policy.
    pub convergence: ConvergencePolicy,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            optimizer: OptimizerConfig::sgd(0.01),
            num_iterations: DEFAULT_NUM_ITERATIONS,
            convergence: ConvergencePolicy::default(),
        }
    }
}

impl TrainerConfig {
    /// Field-agnostic FM trained with SGD.
    pub fn fm_sgd(num_factors: usize, learning_rate: f64) -> Self {
        Self {
            model: ModelConfig::new(num_factors),
            optimizer: OptimizerConfig::sgd(learning_rate),
            ..Self::default()
        }
    }

    /// Field-agnostic FM trained with FTRL-Proximal.
    pub fn fm_ftrl(num_factors: usize, alpha: f64, beta: f64) -> Self {
        Self {
            model: ModelConfig::new(num_factors),
            optimizer: OptimizerConfig::ftrl(alpha, beta),
            ..Self::default()
        }
    }

    /// Field-aware FM trained with SGD.
    pub fn ffm(num_factors: usize, learning_rate: f64) -> Self {
        Self {
            model: ModelConfig::new(num_factors).with_interaction(InteractionKind::FieldAware),
            optimizer: OptimizerConfig::sgd(learning_rate),
            ..Self::default()
        }
    }

    /// Sets the model configuration.
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    /// Sets the optimizer configuration.
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the iteration budget.
    pub fn with_num_iterations(mut self, num_iterations: usize) -> Self {
        self.num_iterations = num_iterations;
        self
    }

    /// Sets the early-stopping policy.
    pub fn with_convergence(mut self, convergence: ConvergencePolicy) -> Self {
        self.convergence = convergence;
        self
    }

    /// Checks every nested configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero iteration budget, an invalid
    /// tolerance, or an invalid model or optimizer setting.
    pub fn validate(&self) -> TrainResult<()> {
        self.validate_training()?;
        self.model.validate()?;
        Ok(())
    }

    /// Checks everything except `model`, for trainers handed a built model.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero iteration budget, an invalid
    /// tolerance, or an invalid optimizer setting.
    pub fn validate_training(&self) -> TrainResult<()> {
        if self.num_iterations == 0 {
            return Err(TrainError::Config(
                "num_iterations must be positive".to_string(),
            ));
        }
        self.convergence.validate()?;
        self.optimizer.validate()?;
        Ok(())
    }
}
