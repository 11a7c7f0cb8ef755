//! Per-epoch training metrics.

use serde::{Deserialize, Serialize};

/// Accumulates the training loss over one pass through the data.
///
/// The epoch loss is `0.5 * (sum of squared errors + sum of penalties)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossAccumulator {
    squared_error: f64,
    penalty: f64,
    count: usize,
}

impl LossAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one example's error and regularization penalty.
    pub fn record(&mut self, error: f64, penalty: f64) {
        self.squared_error += error * error;
        self.penalty += penalty;
        self.count += 1;
    }

    /// The halved epoch loss.
    pub fn loss(&self) -> f64 {
        0.5 * (self.squared_error + self.penalty)
    }

    /// Root mean squared prediction error, `0.0` for an empty epoch.
    pub fn rmse(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.squared_error / self.count as f64).sqrt()
        }
    }

    /// Number of recorded examples.
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Metrics reported to hooks after each iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Epoch loss.
    pub loss: f64,
    /// Previous epoch's loss, `None` after the first iteration.
    pub last_loss: Option<f64>,
    /// Root mean squared prediction error over the epoch.
    pub rmse: f64,
    /// Number of entries visited.
    pub num_entries: usize,
}

impl EpochMetrics {
    /// Builds the metrics for a finished epoch.
    pub fn new(iteration: usize, accumulator: &LossAccumulator, last_loss: Option<f64>) -> Self {
        Self {
            iteration,
            loss: accumulator.loss(),
            last_loss,
            rmse: accumulator.rmse(),
            num_entries: accumulator.count(),
        }
    }

    /// `last_loss - loss`, when a previous epoch exists.
    pub fn improvement(&self) -> Option<f64> {
        self.last_loss.map(|last| last - self.loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_halves_loss() {
        let mut acc = LossAccumulator::new();
        acc.record(1.0, 0.5);
        acc.record(-2.0, 0.25);
        assert!((acc.loss() - 0.5 * (1.0 + 4.0 + 0.75)).abs() < 1e-12);
        assert!((acc.rmse() - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(acc.count(), 2);
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = LossAccumulator::new();
        assert_eq!(acc.loss(), 0.0);
        assert_eq!(acc.rmse(), 0.0);
    }

    #[test]
    fn test_epoch_metrics() {
        let mut acc = LossAccumulator::new();
        acc.record(2.0, 0.0);
        let metrics = EpochMetrics::new(3, &acc, Some(4.0));
        assert_eq!(metrics.iteration, 3);
        assert_eq!(metrics.loss, 2.0);
        assert_eq!(metrics.improvement(), Some(2.0));
        assert_eq!(metrics.num_entries, 1);

        let first = EpochMetrics::new(1, &acc, None);
        assert_eq!(first.improvement(), None);
    }
}
