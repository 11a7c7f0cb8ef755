//! Stochastic Gradient Descent (SGD) optimizer.
//!
//! Every touched coordinate takes one subgradient step on the squared
//! error plus its own L2 penalty, with a constant learning rate.
//!
//! # Example
//!
//! ```
//! use sparsefm_model::{FmModel, InitializerConfig, ModelConfig};
//! use sparsefm_optimizer::{Optimizer, OptimizerConfig, Sgd};
//!
//! let config = ModelConfig::new(1).with_initializer(InitializerConfig::Zeros);
//! let mut model = FmModel::from_cardinalities(config, &[2, 2]).unwrap();
//! let mut sgd = Sgd::new(OptimizerConfig::sgd(0.1)).unwrap();
//!
//! let x = model.encode(&[0, 1]).unwrap();
//! sgd.apply_example(model.params_mut(), &x, -1.0);
//! assert!((model.params().w0() - 0.1).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use sparsefm_core::SparseVector;
use sparsefm_model::interaction::{factor_partial, touched_columns};
use sparsefm_model::ParameterStore;

use crate::{Optimizer, OptimizerConfig, OptimizerError};

/// SGD optimizer.
///
/// With `e = prediction - label`:
/// ```text
/// w0     -= lr * (e + reg_bias * w0)
/// W_i    -= lr * (e * x_i + reg_linear * W_i)
/// V_{i,c} -= lr * (e * h_{i,c} + reg_factor * V_{i,c})
/// ```
/// where `h_{i,c}` is the partial of the interaction term. Coordinates are
/// updated in place, bias first, then per active feature its weight
/// followed by its factor columns; each partial reads the factors as they
/// stand at that point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sgd {
    learning_rate: f64,
    reg_bias: f64,
    reg_linear: f64,
    reg_factor: f64,
    config: OptimizerConfig,
    /// Scratch buffer for touched factor columns.
    #[serde(skip)]
    columns: Vec<usize>,
}

impl Sgd {
    /// Creates a new SGD optimizer without regularization.
    pub fn with_learning_rate(learning_rate: f64) -> Result<Self, OptimizerError> {
        Self::new(OptimizerConfig::sgd(learning_rate))
    }

    /// The constant learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl Optimizer for Sgd {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::Sgd {
                learning_rate,
                reg_bias,
                reg_linear,
                reg_factor,
            } => {
                config.validate()?;
                Ok(Self {
                    learning_rate,
                    reg_bias,
                    reg_linear,
                    reg_factor,
                    config,
                    columns: Vec::new(),
                })
            }
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Sgd".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn apply_example(&mut self, params: &mut ParameterStore, x: &SparseVector, error: f64) -> f64 {
        let lr = self.learning_rate;
        let mut penalty = 0.0;

        let w0 = params.w0();
        penalty += self.reg_bias * w0 * w0;
        params.add_w0(-lr * (error + self.reg_bias * w0));

        let mut columns = std::mem::take(&mut self.columns);
        for (pos, entry) in x.iter().enumerate() {
            let i = entry.index;

            let wi = params.weight(i);
            penalty += self.reg_linear * wi * wi;
            params.add_weight(i, -lr * (error * entry.value + self.reg_linear * wi));

            touched_columns(params, x, pos, &mut columns);
            for &col in &columns {
                let vic = params.factors().get(i, col);
                let h = factor_partial(params, x, pos, col);
                params
                    .factors_mut()
                    .add(i, col, -lr * (error * h + self.reg_factor * vic));
                penalty += self.reg_factor * vic * vic;
            }
        }
        self.columns = columns;

        penalty
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}
