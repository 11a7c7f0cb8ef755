//! Latent factor initializers.
//!
//! Initializers fill the factor matrix when a model is created. All random
//! initializers draw from a caller-supplied seeded RNG, so the same seed
//! always reproduces the same starting parameters.
//!
//! # Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use sparsefm_model::initializer::{Initializer, RandomNormalInitializer};
//!
//! let initializer = RandomNormalInitializer::new(0.0, 0.1).unwrap();
//! let mut factors = vec![0.0; 16];
//! initializer.fill(&mut factors, &mut StdRng::seed_from_u64(7));
//! assert!(factors.iter().any(|&v| v != 0.0));
//! ```

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// A strategy for filling a parameter buffer with initial values.
pub trait Initializer: Send + Sync {
    /// Overwrites every value of `out`.
    fn fill(&self, out: &mut [f64], rng: &mut StdRng);

    /// Returns the name of this initializer, for logging.
    fn name(&self) -> &str;
}

/// Initializer that sets all values to zero.
///
/// With zero factors the model degenerates to a linear model, and SGD
/// never moves the factors away from zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZerosInitializer;

impl Initializer for ZerosInitializer {
    fn fill(&self, out: &mut [f64], _rng: &mut StdRng) {
        out.fill(0.0);
    }

    fn name(&self) -> &str {
        "zeros"
    }
}

/// Initializer that sets all values to a constant.
#[derive(Debug, Clone, Copy)]
pub struct ConstantInitializer {
    value: f64,
}

impl ConstantInitializer {
    /// Creates a new constant initializer.
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    /// Returns the constant value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Initializer for ConstantInitializer {
    fn fill(&self, out: &mut [f64], _rng: &mut StdRng) {
        out.fill(self.value);
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Initializer that samples from a normal distribution.
#[derive(Debug, Clone, Copy)]
pub struct RandomNormalInitializer {
    normal: Normal<f64>,
}

impl RandomNormalInitializer {
    /// Creates a new normal initializer.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if `stddev` is not a positive
    /// finite number or `mean` is not finite.
    pub fn new(mean: f64, stddev: f64) -> Result<Self> {
        if !mean.is_finite() || !stddev.is_finite() || stddev <= 0.0 {
            return Err(ModelError::config(format!(
                "normal initializer needs finite mean and positive stddev, got mean={}, stddev={}",
                mean, stddev
            )));
        }
        let normal = Normal::new(mean, stddev)
            .map_err(|e| ModelError::config(format!("normal initializer: {}", e)))?;
        Ok(Self { normal })
    }

    /// Returns the mean.
    pub fn mean(&self) -> f64 {
        self.normal.mean()
    }

    /// Returns the standard deviation.
    pub fn stddev(&self) -> f64 {
        self.normal.std_dev()
    }
}

impl Initializer for RandomNormalInitializer {
    fn fill(&self, out: &mut [f64], rng: &mut StdRng) {
        for v in out.iter_mut() {
            *v = self.normal.sample(rng);
        }
    }

    fn name(&self) -> &str {
        "random_normal"
    }
}

/// Serializable initializer selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InitializerConfig {
    /// All zeros.
    Zeros,
    /// A constant value.
    Constant {
        /// The value to fill with.
        value: f64,
    },
    /// Normal distribution.
    RandomNormal {
        /// Mean of the distribution.
        mean: f64,
        /// Standard deviation of the distribution.
        stddev: f64,
    },
}

impl Default for InitializerConfig {
    fn default() -> Self {
        InitializerConfig::RandomNormal {
            mean: 0.0,
            stddev: 0.1,
        }
    }
}

impl InitializerConfig {
    /// Validates the configuration without building an initializer.
    pub fn validate(&self) -> Result<()> {
        self.build().map(|_| ())
    }

    /// Creates the initializer described by this configuration.
    pub fn build(&self) -> Result<Box<dyn Initializer>> {
        match *self {
            InitializerConfig::Zeros => Ok(Box::new(ZerosInitializer)),
            InitializerConfig::Constant { value } => {
                if !value.is_finite() {
                    return Err(ModelError::config(format!(
                        "constant initializer value must be finite, got {}",
                        value
                    )));
                }
                Ok(Box::new(ConstantInitializer::new(value)))
            }
            InitializerConfig::RandomNormal { mean, stddev } => {
                Ok(Box::new(RandomNormalInitializer::new(mean, stddev)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_zeros_initializer() {
        let mut out = vec![1.0; 4];
        ZerosInitializer.fill(&mut out, &mut StdRng::seed_from_u64(0));
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn test_constant_initializer() {
        let mut out = vec![0.0; 3];
        ConstantInitializer::new(0.25).fill(&mut out, &mut StdRng::seed_from_u64(0));
        assert_eq!(out, vec![0.25; 3]);
    }

    #[test]
    fn test_random_normal_is_reproducible() {
        let init = RandomNormalInitializer::new(0.0, 0.1).unwrap();
        let mut a = vec![0.0; 32];
        let mut b = vec![0.0; 32];
        init.fill(&mut a, &mut StdRng::seed_from_u64(42));
        init.fill(&mut b, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);

        let mut c = vec![0.0; 32];
        init.fill(&mut c, &mut StdRng::seed_from_u64(43));
        assert_ne!(a, c);
    }

    #[test]
    fn test_random_normal_statistics() {
        let init = RandomNormalInitializer::new(0.0, 0.1).unwrap();
        let mut out = vec![0.0; 10_000];
        init.fill(&mut out, &mut StdRng::seed_from_u64(1));

        let mean = out.iter().sum::<f64>() / out.len() as f64;
        let var = out.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / out.len() as f64;
        assert!(mean.abs() < 0.01, "mean should be near 0, got {}", mean);
        assert!((var.sqrt() - 0.1).abs() < 0.01);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(RandomNormalInitializer::new(0.0, 0.0).is_err());
        assert!(RandomNormalInitializer::new(0.0, -1.0).is_err());
        assert!(RandomNormalInitializer::new(f64::NAN, 0.1).is_err());
        assert!(InitializerConfig::Constant { value: f64::INFINITY }
            .validate()
            .is_err());
        assert!(InitializerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_build_names() {
        assert_eq!(InitializerConfig::Zeros.build().unwrap().name(), "zeros");
        assert_eq!(
            InitializerConfig::Constant { value: 1.0 }.build().unwrap().name(),
            "constant"
        );
        assert_eq!(InitializerConfig::default().build().unwrap().name(), "random_normal");
    }

    #[test]
    fn test_config_serialization() {
        let config = InitializerConfig::RandomNormal {
            mean: 0.0,
            stddev: 0.05,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: InitializerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
