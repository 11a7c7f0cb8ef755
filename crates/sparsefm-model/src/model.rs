//! Factorization machine model: field map, parameters and prediction.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sparsefm_core::{FeatureEncoder, FieldMap, SparseVector};

use crate::error::{ModelError, Result};
use crate::initializer::InitializerConfig;
use crate::interaction::{self, InteractionKind};
use crate::params::ParameterStore;

/// Model hyperparameters.
///
/// # Examples
///
/// ```
/// use sparsefm_model::{InteractionKind, ModelConfig};
///
/// let config = ModelConfig::new(8)
///     .with_interaction(InteractionKind::FieldAware)
///     .with_seed(7)
///     .with_rating_range(1.0, 5.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of latent dimensions `k`.
    pub num_factors: usize,
    /// Field-agnostic or field-aware factors.
    pub interaction: InteractionKind,
    /// How the factor matrix is initialized.
    pub initializer: InitializerConfig,
    /// Seed of the initializer RNG.
    pub seed: u64,
    /// Optional `(min, max)` clamp applied by [`FmModel::predict_rating`].
    pub rating_range: Option<(f64, f64)>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_factors: 10,
            interaction: InteractionKind::Factorization,
            initializer: InitializerConfig::default(),
            seed: 0,
            rating_range: None,
        }
    }
}

impl ModelConfig {
    /// Creates a config with `num_factors` latent dimensions and defaults
    /// for everything else.
    pub fn new(num_factors: usize) -> Self {
        Self {
            num_factors,
            ..Self::default()
        }
    }

    pub fn with_interaction(mut self, interaction: InteractionKind) -> Self {
        self.interaction = interaction;
        self
    }

    pub fn with_initializer(mut self, initializer: InitializerConfig) -> Self {
        self.initializer = initializer;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_rating_range(mut self, min: f64, max: f64) -> Self {
        self.rating_range = Some((min, max));
        self
    }

    /// Checks every hyperparameter.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] for `k = 0`, an invalid
    /// initializer, or an empty or non-finite rating range.
    pub fn validate(&self) -> Result<()> {
        if self.num_factors == 0 {
            return Err(ModelError::config("num_factors must be at least 1"));
        }
        self.initializer.validate()?;
        if let Some((min, max)) = self.rating_range {
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(ModelError::config(format!(
                    "rating range [{}, {}] is invalid",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// A factorization machine over a fixed field map.
///
/// # Examples
///
/// ```
/// use sparsefm_core::FieldMap;
/// use sparsefm_model::{FmModel, InitializerConfig, ModelConfig};
///
/// let config = ModelConfig::new(2).with_initializer(InitializerConfig::Zeros);
/// let mut model = FmModel::new(config, FieldMap::new(&[3, 2]).unwrap()).unwrap();
/// model.params_mut().set_w0(1.5);
/// assert_eq!(model.predict_keys(&[0, 1]).unwrap(), 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct FmModel {
    config: ModelConfig,
    encoder: FeatureEncoder,
    params: ParameterStore,
}

impl FmModel {
    /// Creates a model with `w0 = 0`, `W = 0` and `V` drawn from the
    /// configured initializer.
    pub fn new(config: ModelConfig, field_map: FieldMap) -> Result<Self> {
        config.validate()?;

        let mut params = ParameterStore::zeros(
            field_map.num_features(),
            config.num_factors,
            field_map.num_fields(),
            config.interaction,
        );
        let initializer = config.initializer.build()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        initializer.fill(params.factors_mut().as_mut_slice(), &mut rng);

        Ok(Self {
            config,
            encoder: FeatureEncoder::new(field_map),
            params,
        })
    }

    /// Creates a model from per-field cardinalities.
    pub fn from_cardinalities(config: ModelConfig, cardinalities: &[usize]) -> Result<Self> {
        Self::new(config, FieldMap::new(cardinalities)?)
    }

    /// The model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Field-agnostic or field-aware.
    pub fn kind(&self) -> InteractionKind {
        self.params.kind()
    }

    /// The feature → field lookup.
    pub fn field_map(&self) -> &FieldMap {
        self.encoder.field_map()
    }

    /// The encoder over this model's field map.
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Trained parameters.
    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    /// Mutable parameters, for optimizers.
    pub fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    /// Encodes raw keys over this model's field map.
    pub fn encode(&self, keys: &[usize]) -> Result<SparseVector> {
        Ok(self.encoder.encode(keys)?)
    }

    /// Checks that `x` was built over this model's field map.
    pub fn validate_input(&self, x: &SparseVector) -> Result<()> {
        Ok(self.field_map().check_vector(x)?)
    }

    /// `w0 + sum_i W_i x_i`.
    pub fn linear_term(&self, x: &SparseVector) -> f64 {
        x.iter()
            .fold(self.params.w0(), |acc, e| acc + self.params.weight(e.index) * e.value)
    }

    /// Second-order term.
    pub fn interaction_term(&self, x: &SparseVector) -> f64 {
        interaction::interaction(&self.params, x)
    }

    /// Raw (unclamped) score of `x`.
    ///
    /// `x` must come from this model's field map; see
    /// [`FmModel::validate_input`].
    pub fn predict(&self, x: &SparseVector) -> f64 {
        debug_assert!(self.validate_input(x).is_ok(), "vector does not match field map");
        self.linear_term(x) + self.interaction_term(x)
    }

    /// Encodes `keys` and scores the result.
    pub fn predict_keys(&self, keys: &[usize]) -> Result<f64> {
        Ok(self.predict(&self.encode(keys)?))
    }

    /// Score of `x` clamped into the configured rating range, if any.
    pub fn predict_rating(&self, x: &SparseVector) -> f64 {
        let score = self.predict(x);
        match self.config.rating_range {
            Some((min, max)) => score.clamp(min, max),
            None => score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparsefm_core::FmError;

    fn zero_factor_config(kind: InteractionKind) -> ModelConfig {
        ModelConfig::new(3)
            .with_interaction(kind)
            .with_initializer(InitializerConfig::Zeros)
    }

    #[test]
    fn test_zero_factors_reduce_to_linear_model() {
        for kind in [InteractionKind::Factorization, InteractionKind::FieldAware] {
            let mut model = FmModel::from_cardinalities(zero_factor_config(kind), &[2, 3]).unwrap();
            model.params_mut().set_w0(0.5);
            model
                .params_mut()
                .set_weights(&[1.0, 2.0, 3.0, 4.0, 5.0])
                .unwrap();

            let x = model.encode(&[1, 2]).unwrap();
            assert_eq!(model.interaction_term(&x), 0.0);
            assert_eq!(model.predict(&x), 0.5 + 2.0 + 5.0);
        }
    }

    #[test]
    fn test_prediction_is_order_invariant() {
        for kind in [InteractionKind::Factorization, InteractionKind::FieldAware] {
            let config = ModelConfig::new(4).with_interaction(kind).with_seed(9);
            let model = FmModel::from_cardinalities(config, &[3, 3, 3]).unwrap();

            let map = model.field_map();
            let forward = SparseVector::from_pairs(map, &[(1, 1.0), (4, 0.5), (8, 2.0)]).unwrap();
            let reversed = SparseVector::from_pairs(map, &[(8, 2.0), (4, 0.5), (1, 1.0)]).unwrap();
            let shuffled = SparseVector::from_pairs(map, &[(4, 0.5), (8, 2.0), (1, 1.0)]).unwrap();

            let expected = model.predict(&forward);
            assert!((model.predict(&reversed) - expected).abs() < 1e-12);
            assert!((model.predict(&shuffled) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_validate_input_rejects_foreign_vectors() {
        let config = ModelConfig::new(2).with_interaction(InteractionKind::FieldAware);
        let model = FmModel::from_cardinalities(config, &[2, 2]).unwrap();
        let own = model.encode(&[1, 0]).unwrap();
        assert!(model.validate_input(&own).is_ok());

        // index 1 sits in field 1 of [1, 3] but in field 0 here
        let other = FieldMap::new(&[1, 3]).unwrap();
        let x = SparseVector::from_pairs(&other, &[(0, 1.0), (1, 1.0)]).unwrap();
        assert!(matches!(
            model.validate_input(&x),
            Err(ModelError::Core(FmError::FieldMismatch { index: 1, .. }))
        ));

        let wide = FieldMap::new(&[8, 8]).unwrap();
        let x = SparseVector::from_pairs(&wide, &[(9, 1.0)]).unwrap();
        assert!(matches!(
            model.validate_input(&x),
            Err(ModelError::Core(FmError::FeatureOutOfRange { index: 9, .. }))
        ));
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let config = ModelConfig::new(4).with_seed(123);
        let a = FmModel::from_cardinalities(config.clone(), &[5, 5]).unwrap();
        let b = FmModel::from_cardinalities(config, &[5, 5]).unwrap();
        assert_eq!(a.params(), b.params());
        assert_eq!(a.params().w0(), 0.0);
        assert!(a.params().weights().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_field_aware_shape() {
        let config = ModelConfig::new(4).with_interaction(InteractionKind::FieldAware);
        let model = FmModel::from_cardinalities(config, &[2, 3, 4]).unwrap();
        assert_eq!(model.params().factors().shape(), (9, 12));
        assert_eq!(model.kind(), InteractionKind::FieldAware);
    }

    #[test]
    fn test_predict_keys_propagates_encoder_errors() {
        let model = FmModel::from_cardinalities(ModelConfig::new(2), &[2, 2]).unwrap();
        let err = model.predict_keys(&[0, 5]).unwrap_err();
        assert_eq!(
            err,
            ModelError::Core(FmError::InvalidFieldKey {
                field: 1,
                key: 5,
                cardinality: 2
            })
        );
    }

    #[test]
    fn test_predict_rating_clamps() {
        let config = zero_factor_config(InteractionKind::Factorization).with_rating_range(1.0, 5.0);
        let mut model = FmModel::from_cardinalities(config, &[1, 1]).unwrap();
        let x = model.encode(&[0, 0]).unwrap();

        model.params_mut().set_w0(9.0);
        assert_eq!(model.predict(&x), 9.0);
        assert_eq!(model.predict_rating(&x), 5.0);

        model.params_mut().set_w0(-2.0);
        assert_eq!(model.predict_rating(&x), 1.0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ModelConfig::new(0).validate().is_err());
        assert!(ModelConfig::new(2)
            .with_rating_range(5.0, 1.0)
            .validate()
            .is_err());
        assert!(FmModel::from_cardinalities(ModelConfig::new(2), &[]).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = ModelConfig::new(6)
            .with_interaction(InteractionKind::FieldAware)
            .with_rating_range(0.5, 5.0);
        let json = serde_json::to_string(&config).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
