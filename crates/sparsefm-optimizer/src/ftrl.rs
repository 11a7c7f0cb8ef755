//! FTRL-Proximal (Follow The Regularized Leader) optimizer.
//!
//! FTRL keeps two accumulators per coordinate and recomputes the
//! coordinate from them in closed form on every touch. The L1 term
//! thresholds small accumulated gradients to an exact zero, which makes
//! the trained model sparse.
//!
//! # Example
//!
//! ```
//! use sparsefm_model::{FmModel, ModelConfig};
//! use sparsefm_optimizer::{Ftrl, Optimizer, OptimizerConfig};
//!
//! let mut model = FmModel::from_cardinalities(ModelConfig::new(2), &[3, 3]).unwrap();
//! let mut ftrl = Ftrl::new(OptimizerConfig::ftrl(0.1, 1.0)).unwrap();
//!
//! let x = model.encode(&[0, 2]).unwrap();
//! ftrl.apply_example(model.params_mut(), &x, 1.0);
//! assert!(ftrl.n_weights()[0] > 0.0);
//! ```

use serde::{Deserialize, Serialize};
use sparsefm_core::SparseVector;
use sparsefm_model::interaction::{factor_partial, touched_columns};
use sparsefm_model::ParameterStore;

use crate::{Optimizer, OptimizerConfig, OptimizerError};

/// The four FTRL hyperparameters and the per-coordinate update rule.
///
/// ```text
/// sigma = (sqrt(n + g^2) - sqrt(n)) / alpha
/// z     = z + g - sigma * theta
/// n     = n + g^2
/// if |z| <= lambda1:
///     theta = 0
/// else:
///     theta = -(z - sign(z) * lambda1) / ((beta + sqrt(n)) / alpha + lambda2)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FtrlCoefficients {
    /// Learning-rate scale.
    pub alpha: f64,
    /// Learning-rate smoothing.
    pub beta: f64,
    /// L1 threshold.
    pub lambda1: f64,
    /// L2 shrinkage.
    pub lambda2: f64,
}

impl FtrlCoefficients {
    /// Runs one coordinate update and returns the new value of `theta`.
    ///
    /// `z` is updated with the old `theta` before `n` absorbs `g^2`, and the
    /// new value is computed from both updated accumulators.
    #[inline]
    pub fn step(&self, theta: f64, z: &mut f64, n: &mut f64, g: f64) -> f64 {
        let g2 = g * g;
        let sigma = ((*n + g2).sqrt() - n.sqrt()) / self.alpha;
        *z += g - sigma * theta;
        *n += g2;

        if z.abs() <= self.lambda1 {
            0.0
        } else {
            -(*z - sign(*z) * self.lambda1) / ((self.beta + n.sqrt()) / self.alpha + self.lambda2)
        }
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// FTRL-Proximal optimizer.
///
/// Gradients carry no regularization term: `e` for the bias, `e * x_i` for
/// linear weights and `e * h_{i,c}` for factors. Regularization enters only
/// through the proximal step, so the loss contribution is zero.
///
/// Accumulators are allocated on the first update from the parameter
/// store's shape, and reallocated if that shape changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ftrl {
    coefficients: FtrlCoefficients,
    z_bias: f64,
    n_bias: f64,
    z_weights: Vec<f64>,
    n_weights: Vec<f64>,
    /// Row-major, same layout as the factor matrix.
    z_factors: Vec<f64>,
    n_factors: Vec<f64>,
    config: OptimizerConfig,
    #[serde(skip)]
    columns: Vec<usize>,
}

impl Ftrl {
    /// Creates a new FTRL optimizer with the given parameters.
    pub fn with_params(
        alpha: f64,
        beta: f64,
        lambda1: f64,
        lambda2: f64,
    ) -> Result<Self, OptimizerError> {
        Self::new(OptimizerConfig::Ftrl {
            alpha,
            beta,
            lambda1,
            lambda2,
        })
    }

    /// The hyperparameters.
    pub fn coefficients(&self) -> &FtrlCoefficients {
        &self.coefficients
    }

    /// `(z, n)` of the global bias.
    pub fn bias_state(&self) -> (f64, f64) {
        (self.z_bias, self.n_bias)
    }

    /// `z` accumulators of the linear weights.
    pub fn z_weights(&self) -> &[f64] {
        &self.z_weights
    }

    /// `n` accumulators of the linear weights.
    pub fn n_weights(&self) -> &[f64] {
        &self.n_weights
    }

    /// `z` accumulators of the factors, row-major.
    pub fn z_factors(&self) -> &[f64] {
        &self.z_factors
    }

    /// `n` accumulators of the factors, row-major.
    pub fn n_factors(&self) -> &[f64] {
        &self.n_factors
    }

    /// Resets the optimizer state.
    pub fn reset_state(&mut self) {
        self.z_bias = 0.0;
        self.n_bias = 0.0;
        self.z_weights.clear();
        self.n_weights.clear();
        self.z_factors.clear();
        self.n_factors.clear();
    }

    fn ensure_state(&mut self, params: &ParameterStore) {
        let num_weights = params.num_features();
        let num_factors = params.factors().as_slice().len();
        if self.z_weights.len() != num_weights || self.z_factors.len() != num_factors {
            self.reset_state();
            self.z_weights = vec![0.0; num_weights];
            self.n_weights = vec![0.0; num_weights];
            self.z_factors = vec![0.0; num_factors];
            self.n_factors = vec![0.0; num_factors];
        }
    }
}

impl Optimizer for Ftrl {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::Ftrl {
                alpha,
                beta,
                lambda1,
                lambda2,
            } => {
                config.validate()?;
                Ok(Self {
                    coefficients: FtrlCoefficients {
                        alpha,
                        beta,
                        lambda1,
                        lambda2,
                    },
                    z_bias: 0.0,
                    n_bias: 0.0,
                    z_weights: Vec::new(),
                    n_weights: Vec::new(),
                    z_factors: Vec::new(),
                    n_factors: Vec::new(),
                    config,
                    columns: Vec::new(),
                })
            }
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Ftrl".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn apply_example(&mut self, params: &mut ParameterStore, x: &SparseVector, error: f64) -> f64 {
        self.ensure_state(params);
        let coef = self.coefficients;
        let cols = params.factors().cols();

        let w0 = coef.step(params.w0(), &mut self.z_bias, &mut self.n_bias, error);
        params.set_w0(w0);

        let mut columns = std::mem::take(&mut self.columns);
        for (pos, entry) in x.iter().enumerate() {
            let i = entry.index;

            let g = error * entry.value;
            let wi = coef.step(
                params.weight(i),
                &mut self.z_weights[i],
                &mut self.n_weights[i],
                g,
            );
            params.set_weight(i, wi);

            touched_columns(params, x, pos, &mut columns);
            for &col in &columns {
                let g = error * factor_partial(params, x, pos, col);
                let slot = i * cols + col;
                let v = coef.step(
                    params.factors().get(i, col),
                    &mut self.z_factors[slot],
                    &mut self.n_factors[slot],
                    g,
                );
                params.factors_mut().set(i, col, v);
            }
        }
        self.columns = columns;

        0.0
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}
