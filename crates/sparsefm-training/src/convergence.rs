//! Convergence control for epoch-based training.
//!
//! The controller walks the state machine
//! `Running -> {Running, Converged, MaxIterReached}` once per iteration. The
//! previous epoch's loss is snapshotted before every iteration and compared
//! with the new loss once the iteration finishes.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{TrainError, TrainResult};

/// Default tolerance of the early-stopping predicate.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

/// How the loss change between two epochs is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceCriterion {
    /// `|last_loss - loss| < tolerance`
    Absolute,
    /// `|last_loss - loss| / max(|last_loss|, eps) < tolerance`
    Relative,
}

impl ConvergenceCriterion {
    /// Returns true if going from `last_loss` to `loss` is within `tolerance`.
    pub fn is_met(&self, last_loss: f64, loss: f64, tolerance: f64) -> bool {
        let delta = (last_loss - loss).abs();
        match self {
            ConvergenceCriterion::Absolute => delta < tolerance,
            ConvergenceCriterion::Relative => delta / last_loss.abs().max(f64::EPSILON) < tolerance,
        }
    }
}

/// When training stops before the iteration budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConvergencePolicy {
    /// Always run every configured iteration.
    RunToCompletion,
    /// Stop as soon as the loss change falls below `tolerance`.
    EarlyStop {
        /// How the change is measured.
        criterion: ConvergenceCriterion,
        /// Threshold the change must fall below.
        tolerance: f64,
    },
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        ConvergencePolicy::EarlyStop {
            criterion: ConvergenceCriterion::Absolute,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ConvergencePolicy {
    /// Early stopping on the absolute loss change.
    pub fn absolute(tolerance: f64) -> Self {
        ConvergencePolicy::EarlyStop {
            criterion: ConvergenceCriterion::Absolute,
            tolerance,
        }
    }

    /// Early stopping on the relative loss change.
    pub fn relative(tolerance: f64) -> Self {
        ConvergencePolicy::EarlyStop {
            criterion: ConvergenceCriterion::Relative,
            tolerance,
        }
    }

    /// Checks the tolerance.
    pub fn validate(&self) -> TrainResult<()> {
        if let ConvergencePolicy::EarlyStop { tolerance, .. } = self {
            if !tolerance.is_finite() || *tolerance < 0.0 {
                return Err(TrainError::Config(format!(
                    "convergence tolerance must be non-negative and finite, got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }
}

/// Where the training state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainState {
    /// More iterations will run.
    Running,
    /// The early-stopping predicate held.
    Converged,
    /// The iteration budget is exhausted.
    MaxIterReached,
}

impl TrainState {
    /// Returns true for `Converged` and `MaxIterReached`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TrainState::Running)
    }
}

/// Loss of the current and previous epoch, plus every epoch's loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossTrace {
    loss: Option<f64>,
    last_loss: Option<f64>,
    history: Vec<f64>,
}

impl LossTrace {
    /// Loss of the most recent epoch.
    pub fn loss(&self) -> Option<f64> {
        self.loss
    }

    /// Loss of the epoch before the most recent one.
    pub fn last_loss(&self) -> Option<f64> {
        self.last_loss
    }

    /// Loss of every finished epoch, in order.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// `last_loss - loss`, once two epochs have finished.
    pub fn delta(&self) -> Option<f64> {
        Some(self.last_loss? - self.loss?)
    }
}

/// Drives the training state machine.
///
/// # Examples
///
/// ```
/// use sparsefm_training::convergence::{ConvergenceController, ConvergencePolicy, TrainState};
///
/// let mut controller = ConvergenceController::new(ConvergencePolicy::absolute(0.1), 10);
/// controller.begin_iteration();
/// assert_eq!(controller.finish_iteration(1.0).unwrap(), TrainState::Running);
/// controller.begin_iteration();
/// assert_eq!(controller.finish_iteration(0.95).unwrap(), TrainState::Converged);
/// assert_eq!(controller.iterations(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ConvergenceController {
    policy: ConvergencePolicy,
    num_iterations: usize,
    iterations: usize,
    state: TrainState,
    trace: LossTrace,
}

impl ConvergenceController {
    /// Creates a controller for at most `num_iterations` iterations.
    pub fn new(policy: ConvergencePolicy, num_iterations: usize) -> Self {
        Self {
            policy,
            num_iterations,
            iterations: 0,
            state: TrainState::Running,
            trace: LossTrace::default(),
        }
    }

    /// Snapshots the previous loss and returns the 1-based number of the
    /// iteration about to run.
    pub fn begin_iteration(&mut self) -> usize {
        if let Some(loss) = self.trace.loss {
            self.trace.last_loss = Some(loss);
        }
        self.iterations + 1
    }

    /// Records the finished iteration's loss and advances the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NumericDivergence`] if `loss` is not finite.
    pub fn finish_iteration(&mut self, loss: f64) -> TrainResult<TrainState> {
        self.iterations += 1;
        if !loss.is_finite() {
            return Err(TrainError::NumericDivergence {
                iteration: self.iterations,
                entry: None,
                value: loss,
            });
        }

        self.trace.loss = Some(loss);
        self.trace.history.push(loss);

        let converged = match (self.policy, self.trace.last_loss) {
            (
                ConvergencePolicy::EarlyStop {
                    criterion,
                    tolerance,
                },
                Some(last_loss),
            ) => criterion.is_met(last_loss, loss, tolerance),
            _ => false,
        };

        self.state = if converged {
            info!(
                iteration = self.iterations,
                loss,
                "loss change within tolerance, stopping early"
            );
            TrainState::Converged
        } else if self.iterations >= self.num_iterations {
            TrainState::MaxIterReached
        } else {
            TrainState::Running
        };
        debug!(iteration = self.iterations, loss, state = ?self.state, "iteration finished");

        Ok(self.state)
    }

    /// Current state.
    pub fn state(&self) -> TrainState {
        self.state
    }

    /// Number of finished iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// The loss trace so far.
    pub fn trace(&self) -> &LossTrace {
        &self.trace
    }

    /// Consumes the controller, returning its loss trace.
    pub fn into_trace(self) -> LossTrace {
        self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(controller: &mut ConvergenceController, losses: &[f64]) -> Vec<TrainState> {
        losses
            .iter()
            .map(|&loss| {
                controller.begin_iteration();
                controller.finish_iteration(loss).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_stops_at_first_stable_iteration() {
        let mut controller = ConvergenceController::new(ConvergencePolicy::absolute(0.01), 10);
        let states = run(&mut controller, &[5.0, 3.0, 2.0, 1.995]);
        assert_eq!(
            states,
            vec![
                TrainState::Running,
                TrainState::Running,
                TrainState::Running,
                TrainState::Converged
            ]
        );
        assert_eq!(controller.iterations(), 4);
        assert_eq!(controller.trace().last_loss(), Some(2.0));
        assert_eq!(controller.trace().loss(), Some(1.995));
    }

    #[test]
    fn test_first_iteration_never_converges() {
        let mut controller = ConvergenceController::new(ConvergencePolicy::absolute(1.0), 5);
        controller.begin_iteration();
        assert_eq!(controller.finish_iteration(0.0).unwrap(), TrainState::Running);
        assert_eq!(controller.trace().last_loss(), None);
        assert_eq!(controller.trace().delta(), None);
    }

    #[test]
    fn test_run_to_completion_ignores_stable_loss() {
        let mut controller = ConvergenceController::new(ConvergencePolicy::RunToCompletion, 3);
        let states = run(&mut controller, &[1.0, 1.0, 1.0]);
        assert_eq!(
            states,
            vec![
                TrainState::Running,
                TrainState::Running,
                TrainState::MaxIterReached
            ]
        );
        assert_eq!(controller.trace().history(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_converged_wins_over_budget() {
        let mut controller = ConvergenceController::new(ConvergencePolicy::absolute(0.5), 2);
        let states = run(&mut controller, &[1.0, 0.9]);
        assert_eq!(states[1], TrainState::Converged);
    }

    #[test]
    fn test_relative_criterion() {
        assert!(ConvergenceCriterion::Relative.is_met(1000.0, 999.5, 1e-3));
        assert!(!ConvergenceCriterion::Absolute.is_met(1000.0, 999.5, 1e-3));
        assert!(ConvergenceCriterion::Relative.is_met(0.0, 0.0, 1e-3));
    }

    #[test]
    fn test_non_finite_loss_diverges() {
        let mut controller = ConvergenceController::new(ConvergencePolicy::default(), 5);
        controller.begin_iteration();
        controller.finish_iteration(1.0).unwrap();
        controller.begin_iteration();
        let err = controller.finish_iteration(f64::NAN).unwrap_err();
        assert!(matches!(
            err,
            TrainError::NumericDivergence {
                iteration: 2,
                entry: None,
                ..
            }
        ));
    }

    #[test]
    fn test_policy_validation() {
        assert!(ConvergencePolicy::absolute(-1.0).validate().is_err());
        assert!(ConvergencePolicy::relative(f64::NAN).validate().is_err());
        assert!(ConvergencePolicy::default().validate().is_ok());
        assert!(ConvergencePolicy::RunToCompletion.validate().is_ok());
    }

    #[test]
    fn test_policy_serialization() {
        let policy = ConvergencePolicy::relative(1e-4);
        let json = serde_json::to_string(&policy).unwrap();
        let back: ConvergencePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
