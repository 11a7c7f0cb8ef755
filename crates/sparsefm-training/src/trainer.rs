//! Epoch-driven trainer.
//!
//! Each iteration is one pass over the interaction tensor in storage order.
//! For every entry the trainer encodes the keys, predicts with the current
//! parameters, and hands the error to the optimizer, which updates the
//! touched coordinates before the next entry is visited.

use serde::{Deserialize, Serialize};
use sparsefm_core::{FieldMap, InteractionTensor};
use sparsefm_model::FmModel;
use sparsefm_optimizer::{create_optimizer, FmOptimizer};
use tracing::{debug, info, warn};

use crate::config::TrainerConfig;
use crate::convergence::{ConvergenceController, LossTrace, TrainState};
use crate::error::{TrainError, TrainResult};
use crate::hooks::{Hook, HookList};
use crate::metrics::{EpochMetrics, LossAccumulator};

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    /// Terminal state: `Converged` or `MaxIterReached`.
    pub state: TrainState,
    /// Number of completed iterations.
    pub iterations: usize,
    /// Loss of every epoch plus the final and previous loss.
    pub loss_trace: LossTrace,
}

impl TrainReport {
    /// Returns true if training stopped on the early-stopping predicate.
    pub fn converged(&self) -> bool {
        self.state == TrainState::Converged
    }

    /// Loss of the final epoch.
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_trace.loss()
    }
}

/// Trains a factorization machine on an interaction tensor.
///
/// # Examples
///
/// ```
/// use sparsefm_core::InteractionTensor;
/// use sparsefm_training::{Trainer, TrainerConfig};
///
/// let mut data = InteractionTensor::new(vec![3, 2]).unwrap();
/// data.push(vec![0, 1], 4.0).unwrap();
/// data.push(vec![2, 0], 1.0).unwrap();
///
/// let config = TrainerConfig::fm_sgd(2, 0.05).with_num_iterations(20);
/// let mut trainer = Trainer::from_cardinalities(config, data.dimensions()).unwrap();
/// let report = trainer.train(&data).unwrap();
/// assert!(report.iterations <= 20);
/// ```
#[derive(Debug)]
pub struct Trainer {
    config: TrainerConfig,
    model: FmModel,
    optimizer: FmOptimizer,
    hooks: HookList,
}

impl Trainer {
    /// Creates a trainer around an existing model.
    ///
    /// The model's own configuration takes precedence over `config.model`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the training part of `config` is
    /// invalid. `config.model` is not checked.
    pub fn new(config: TrainerConfig, model: FmModel) -> TrainResult<Self> {
        config.validate_training()?;
        let optimizer = create_optimizer(config.optimizer.clone())?;
        debug!(
            optimizer = optimizer.name(),
            interaction = model.kind().name(),
            num_features = model.field_map().num_features(),
            "created trainer"
        );
        Ok(Self {
            config,
            model,
            optimizer,
            hooks: HookList::new(),
        })
    }

    /// Creates a trainer with a freshly initialized model over `field_map`.
    pub fn with_field_map(config: TrainerConfig, field_map: FieldMap) -> TrainResult<Self> {
        config.validate()?;
        let model = FmModel::new(config.model.clone(), field_map)?;
        Self::new(config, model)
    }

    /// Creates a trainer with a freshly initialized model over fields of
    /// the given cardinalities.
    pub fn from_cardinalities(
        config: TrainerConfig,
        cardinalities: &[usize],
    ) -> TrainResult<Self> {
        config.validate()?;
        let field_map = FieldMap::new(cardinalities).map_err(sparsefm_model::ModelError::from)?;
        Self::with_field_map(config, field_map)
    }

    /// Registers a hook.
    pub fn add_hook<H: Hook + 'static>(&mut self, hook: H) {
        self.hooks.add(hook);
    }

    /// Builder-style [`add_hook`](Self::add_hook).
    pub fn with_hook<H: Hook + 'static>(mut self, hook: H) -> Self {
        self.add_hook(hook);
        self
    }

    /// The trainer configuration.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// The model being trained.
    pub fn model(&self) -> &FmModel {
        &self.model
    }

    /// Mutable access to the model, e.g. to seed parameters.
    pub fn model_mut(&mut self) -> &mut FmModel {
        &mut self.model
    }

    /// Consumes the trainer, returning the trained model.
    pub fn into_model(self) -> FmModel {
        self.model
    }

    /// The optimizer, including any accumulated FTRL state.
    pub fn optimizer(&self) -> &FmOptimizer {
        &self.optimizer
    }

    /// Runs iterations until the convergence controller stops.
    ///
    /// Parameters persist across calls; every call starts a fresh
    /// convergence trace.
    ///
    /// # Errors
    ///
    /// - [`TrainError::Config`] if the tensor's dimensions differ from the
    ///   model's field cardinalities.
    /// - [`TrainError::Encoding`] if an entry's key is out of range. Entries
    ///   visited earlier in the epoch have already updated the parameters.
    /// - [`TrainError::NumericDivergence`] if an error or epoch loss is not
    ///   finite.
    /// - [`TrainError::Hook`] if a hook fails.
    pub fn train(&mut self, data: &InteractionTensor) -> TrainResult<TrainReport> {
        let cardinalities = self.model.field_map().cardinalities();
        if data.dimensions() != cardinalities {
            return Err(TrainError::Config(format!(
                "tensor dimensions {:?} do not match model fields {:?}",
                data.dimensions(),
                cardinalities
            )));
        }
        if data.is_empty() {
            warn!("training on an empty interaction tensor");
        }

        info!(
            "Starting {} training with {} on {} entries (max {} iterations)",
            self.model.kind().name(),
            self.optimizer.name(),
            data.len(),
            self.config.num_iterations
        );

        let mut controller =
            ConvergenceController::new(self.config.convergence, self.config.num_iterations);
        loop {
            let iteration = controller.begin_iteration();
            self.hooks.before_iteration(iteration)?;

            let accumulator = self.run_epoch(data, iteration)?;
            let state = controller.finish_iteration(accumulator.loss())?;

            let metrics =
                EpochMetrics::new(iteration, &accumulator, controller.trace().last_loss());
            self.hooks.after_iteration(&metrics)?;

            if state.is_terminal() {
                break;
            }
        }

        let report = TrainReport {
            state: controller.state(),
            iterations: controller.iterations(),
            loss_trace: controller.into_trace(),
        };
        self.hooks.end(&report)?;

        info!(
            "Training finished: {:?} after {} iterations",
            report.state, report.iterations
        );
        Ok(report)
    }

    /// One pass over `data`, returning the accumulated loss.
    fn run_epoch(
        &mut self,
        data: &InteractionTensor,
        iteration: usize,
    ) -> TrainResult<LossAccumulator> {
        let mut accumulator = LossAccumulator::new();
        for (position, entry) in data.iter().enumerate() {
            let x = self
                .model
                .encoder()
                .encode(&entry.keys)
                .map_err(|source| TrainError::Encoding {
                    entry: position,
                    source,
                })?;

            let error = self.model.predict(&x) - entry.label;
            if !error.is_finite() {
                warn!(iteration, entry = position, "prediction error is not finite");
                return Err(TrainError::NumericDivergence {
                    iteration,
                    entry: Some(position),
                    value: error,
                });
            }

            let penalty = self
                .optimizer
                .apply_example(self.model.params_mut(), &x, error);
            accumulator.record(error, penalty);
        }
        Ok(accumulator)
    }
}
