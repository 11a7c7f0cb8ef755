//! Per-example optimizers for factorization machines.
//!
//! Each optimizer consumes one example's prediction error and updates the
//! touched coordinates of a [`ParameterStore`] in place. Both strategies
//! implement the [`Optimizer`] trait; [`FmOptimizer`] is the closed set
//! selected from an [`OptimizerConfig`].
//!
//! # Available Optimizers
//!
//! - [`Sgd`] - Stochastic gradient descent with L2 regularization
//! - [`Ftrl`] - FTRL-Proximal with L1/L2 proximal regularization
//!
//! # Example
//!
//! ```
//! use sparsefm_model::{FmModel, ModelConfig};
//! use sparsefm_optimizer::{create_optimizer, OptimizerConfig};
//!
//! let mut model = FmModel::from_cardinalities(ModelConfig::new(2), &[3, 3]).unwrap();
//! let mut optimizer = create_optimizer(OptimizerConfig::sgd(0.01)).unwrap();
//!
//! let x = model.encode(&[1, 2]).unwrap();
//! let error = model.predict(&x) - 4.0;
//! optimizer.apply_example(model.params_mut(), &x, error);
//! assert!(model.params().w0() > 0.0);
//! ```

use serde::{Deserialize, Serialize};
use sparsefm_core::SparseVector;
use sparsefm_model::ParameterStore;
use thiserror::Error;

mod ftrl;
mod sgd;

pub use ftrl::{Ftrl, FtrlCoefficients};
pub use sgd::Sgd;

/// Errors that can occur when working with optimizers.
#[derive(Debug, Error, PartialEq)]
pub enum OptimizerError {
    /// Configuration type does not match the optimizer type.
    #[error("Config mismatch: expected {expected}, got {got}")]
    ConfigMismatch { expected: String, got: String },

    /// Invalid configuration parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Configuration for the supported optimizer types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptimizerConfig {
    /// Stochastic gradient descent configuration.
    Sgd {
        /// Constant learning rate `η`.
        learning_rate: f64,
        /// L2 weight `λ0` on the global bias.
        reg_bias: f64,
        /// L2 weight `λ_W` on linear weights.
        reg_linear: f64,
        /// L2 weight `λ_V` on latent factors.
        reg_factor: f64,
    },

    /// FTRL-Proximal configuration.
    Ftrl {
        /// Learning-rate scale `α`.
        alpha: f64,
        /// Learning-rate smoothing `β`.
        beta: f64,
        /// L1 threshold `λ1`.
        lambda1: f64,
        /// L2 shrinkage `λ2`.
        lambda2: f64,
    },
}

impl OptimizerConfig {
    /// SGD with the given learning rate and no regularization.
    pub fn sgd(learning_rate: f64) -> Self {
        OptimizerConfig::Sgd {
            learning_rate,
            reg_bias: 0.0,
            reg_linear: 0.0,
            reg_factor: 0.0,
        }
    }

    /// FTRL with the given rate terms and no regularization.
    pub fn ftrl(alpha: f64, beta: f64) -> Self {
        OptimizerConfig::Ftrl {
            alpha,
            beta,
            lambda1: 0.0,
            lambda2: 0.0,
        }
    }

    /// Returns the name of the optimizer type.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Sgd { .. } => "Sgd",
            OptimizerConfig::Ftrl { .. } => "Ftrl",
        }
    }

    /// Checks that every hyperparameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::InvalidParameter`] for a non-finite value,
    /// a non-positive learning rate or `α`, or a negative `β` or
    /// regularization weight.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        match *self {
            OptimizerConfig::Sgd {
                learning_rate,
                reg_bias,
                reg_linear,
                reg_factor,
            } => {
                check_positive("learning_rate", learning_rate)?;
                check_non_negative("reg_bias", reg_bias)?;
                check_non_negative("reg_linear", reg_linear)?;
                check_non_negative("reg_factor", reg_factor)
            }
            OptimizerConfig::Ftrl {
                alpha,
                beta,
                lambda1,
                lambda2,
            } => {
                check_positive("alpha", alpha)?;
                check_non_negative("beta", beta)?;
                check_non_negative("lambda1", lambda1)?;
                check_non_negative("lambda2", lambda2)
            }
        }
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), OptimizerError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OptimizerError::InvalidParameter(format!(
            "{} must be positive and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<(), OptimizerError> {
    if !value.is_finite() || value < 0.0 {
        return Err(OptimizerError::InvalidParameter(format!(
            "{} must be non-negative and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Trait for per-example factorization machine optimizers.
pub trait Optimizer: Sized {
    /// Creates a new optimizer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::ConfigMismatch`] if the configuration type
    /// does not match the optimizer type, or
    /// [`OptimizerError::InvalidParameter`] if a value is invalid.
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError>;

    /// Applies one example's update to `params`.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameters to update in place.
    /// * `x` - The example's sparse feature vector.
    /// * `error` - Prediction minus label, computed before any update.
    ///
    /// # Returns
    ///
    /// The regularization penalty this example adds to the training loss,
    /// evaluated on the pre-update value of every touched coordinate.
    fn apply_example(&mut self, params: &mut ParameterStore, x: &SparseVector, error: f64) -> f64;

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

/// The closed set of optimizer strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FmOptimizer {
    /// Stochastic gradient descent.
    Sgd(Sgd),
    /// FTRL-Proximal.
    Ftrl(Ftrl),
}

impl FmOptimizer {
    /// Applies one example's update; see [`Optimizer::apply_example`].
    pub fn apply_example(
        &mut self,
        params: &mut ParameterStore,
        x: &SparseVector,
        error: f64,
    ) -> f64 {
        match self {
            FmOptimizer::Sgd(sgd) => sgd.apply_example(params, x, error),
            FmOptimizer::Ftrl(ftrl) => ftrl.apply_example(params, x, error),
        }
    }

    /// Returns the optimizer's configuration.
    pub fn config(&self) -> &OptimizerConfig {
        match self {
            FmOptimizer::Sgd(sgd) => Optimizer::config(sgd),
            FmOptimizer::Ftrl(ftrl) => Optimizer::config(ftrl),
        }
    }

    /// Returns the name of the optimizer type.
    pub fn name(&self) -> &'static str {
        self.config().name()
    }
}

/// Creates an optimizer from the given configuration.
///
/// # Example
///
/// ```
/// use sparsefm_optimizer::{create_optimizer, OptimizerConfig};
///
/// let optimizer = create_optimizer(OptimizerConfig::Ftrl {
///     alpha: 0.1,
///     beta: 1.0,
///     lambda1: 0.01,
///     lambda2: 0.01,
/// })
/// .unwrap();
/// assert_eq!(optimizer.name(), "Ftrl");
/// ```
pub fn create_optimizer(config: OptimizerConfig) -> Result<FmOptimizer, OptimizerError> {
    match &config {
        OptimizerConfig::Sgd { .. } => Sgd::new(config).map(FmOptimizer::Sgd),
        OptimizerConfig::Ftrl { .. } => Ftrl::new(config).map(FmOptimizer::Ftrl),
    }
}
