//! Factorization machine models for sparsefm.
//!
//! This crate owns the trainable artifact: the [`ParameterStore`] (global
//! bias, linear weights, latent factors) together with the field map it was
//! shaped for, and the prediction formula over sparse feature vectors.
//!
//! - [`InteractionKind::Factorization`] - one factor vector per feature,
//!   interaction evaluated in O(k·n).
//! - [`InteractionKind::FieldAware`] - one factor vector per feature and
//!   counterpart field, interaction evaluated in O(k·n²).
//!
//! # Example
//!
//! ```
//! use sparsefm_model::{FmModel, InteractionKind, ModelConfig};
//!
//! let config = ModelConfig::new(4).with_interaction(InteractionKind::FieldAware);
//! let model = FmModel::from_cardinalities(config, &[10, 20, 5]).unwrap();
//!
//! let x = model.encode(&[3, 17, 0]).unwrap();
//! let score = model.predict(&x);
//! assert!(score.is_finite());
//! ```

pub mod error;
pub mod initializer;
pub mod interaction;
pub mod model;
pub mod params;

pub use error::{ModelError, Result};
pub use initializer::{
    ConstantInitializer, Initializer, InitializerConfig, RandomNormalInitializer, ZerosInitializer,
};
pub use interaction::InteractionKind;
pub use model::{FmModel, ModelConfig};
pub use params::{FactorMatrix, ParameterStore};
