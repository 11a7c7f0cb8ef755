//! Training loop for factorization machines.
//!
//! This crate drives a [`FmModel`](sparsefm_model::FmModel) and one of the
//! [`sparsefm_optimizer`] strategies over an
//! [`InteractionTensor`](sparsefm_core::InteractionTensor):
//!
//! - **Trainer**: epoch passes in storage order with per-example updates
//! - **Convergence**: run-to-completion or early stopping on the loss change
//! - **Hooks**: observers called around every iteration
//! - **Metrics**: halved epoch loss and RMSE
//!
//! ```text
//!  InteractionTensor ──► encode ──► predict ──► error ──► optimizer
//!          ▲                                                  │
//!          └──────────── next entry / next epoch ◄────────────┘
//!                                    │
//!                     ConvergenceController ──► TrainReport
//! ```
//!
//! # Example
//!
//! ```rust
//! use sparsefm_core::InteractionTensor;
//! use sparsefm_training::{LoggingHook, Trainer, TrainerConfig};
//!
//! let mut data = InteractionTensor::new(vec![4, 3]).unwrap();
//! data.push(vec![0, 0], 5.0).unwrap();
//! data.push(vec![1, 2], 3.0).unwrap();
//! data.push(vec![3, 1], 1.0).unwrap();
//!
//! let config = TrainerConfig::ffm(4, 0.05).with_num_iterations(30);
//! let mut trainer = Trainer::from_cardinalities(config, data.dimensions()).unwrap();
//! trainer.add_hook(LoggingHook::new(10));
//!
//! let report = trainer.train(&data).unwrap();
//! let model = trainer.into_model();
//! assert!(report.final_loss().unwrap().is_finite());
//! assert!(model.predict_keys(&[1, 2]).unwrap().is_finite());
//! ```

pub mod config;
pub mod convergence;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod trainer;

pub use config::{TrainerConfig, DEFAULT_NUM_ITERATIONS};
pub use convergence::{
    ConvergenceController, ConvergenceCriterion, ConvergencePolicy, LossTrace, TrainState,
    DEFAULT_TOLERANCE,
};
pub use error::{TrainError, TrainResult};
pub use hooks::{Hook, HookError, HookList, HookResult, LoggingHook};
pub use metrics::{EpochMetrics, LossAccumulator};
pub use trainer::{TrainReport, Trainer};
