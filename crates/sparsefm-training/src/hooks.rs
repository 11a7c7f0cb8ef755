//! Training hooks for observing the training loop.
//!
//! Hooks are called before and after every iteration and once when training
//! ends. They observe progress; stopping is decided by the convergence
//! controller alone. A hook error aborts training.

use thiserror::Error;
use tracing::info;

use crate::metrics::EpochMetrics;
use crate::trainer::TrainReport;

/// Errors that can occur during hook execution.
#[derive(Debug, Error)]
pub enum HookError {
    /// A custom hook error.
    #[error("{0}")]
    Custom(String),
}

/// Result type for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Trait for training hooks.
///
/// # Examples
///
/// ```
/// use sparsefm_training::hooks::{Hook, HookResult};
/// use sparsefm_training::metrics::EpochMetrics;
///
/// struct LossPrinter;
///
/// impl Hook for LossPrinter {
///     fn name(&self) -> &str {
///         "loss_printer"
///     }
///
///     fn after_iteration(&mut self, metrics: &EpochMetrics) -> HookResult<()> {
///         println!("iteration {}: loss = {}", metrics.iteration, metrics.loss);
///         Ok(())
///     }
/// }
/// ```
pub trait Hook: Send + Sync {
    /// Returns the name of this hook for logging purposes.
    fn name(&self) -> &str;

    /// Called before each iteration with its 1-based number.
    fn before_iteration(&mut self, _iteration: usize) -> HookResult<()> {
        Ok(())
    }

    /// Called after each iteration with the epoch's metrics.
    fn after_iteration(&mut self, _metrics: &EpochMetrics) -> HookResult<()> {
        Ok(())
    }

    /// Called once when training ends normally.
    fn end(&mut self, _report: &TrainReport) -> HookResult<()> {
        Ok(())
    }
}

/// A hook that logs the epoch loss at regular intervals.
///
/// # Examples
///
/// ```
/// use sparsefm_training::hooks::LoggingHook;
///
/// // Log every 10 iterations
/// let hook = LoggingHook::new(10);
/// ```
#[derive(Debug)]
pub struct LoggingHook {
    every_n_iterations: usize,
    log_first_iteration: bool,
}

impl LoggingHook {
    /// Creates a logging hook that logs every N iterations.
    pub fn new(every_n_iterations: usize) -> Self {
        Self {
            every_n_iterations: every_n_iterations.max(1),
            log_first_iteration: true,
        }
    }

    /// Sets whether to log after the first iteration.
    pub fn with_log_first_iteration(mut self, log_first: bool) -> Self {
        self.log_first_iteration = log_first;
        self
    }

    fn should_log(&self, iteration: usize) -> bool {
        (iteration == 1 && self.log_first_iteration) || iteration % self.every_n_iterations == 0
    }
}

impl Hook for LoggingHook {
    fn name(&self) -> &str {
        "logging_hook"
    }

    fn after_iteration(&mut self, metrics: &EpochMetrics) -> HookResult<()> {
        if self.should_log(metrics.iteration) {
            let mut msg = format!(
                "Iteration {}: loss = {:.6}, rmse = {:.6}",
                metrics.iteration, metrics.loss, metrics.rmse
            );
            if let Some(improvement) = metrics.improvement() {
                msg.push_str(&format!(", improvement = {:.3e}", improvement));
            }
            info!("{}", msg);
        }
        Ok(())
    }

    fn end(&mut self, report: &TrainReport) -> HookResult<()> {
        match report.loss_trace.loss() {
            Some(loss) => info!(
                "Training finished after {} iterations ({:?}): final loss = {:.6}",
                report.iterations, report.state, loss
            ),
            None => info!("Training finished after {} iterations", report.iterations),
        }
        Ok(())
    }
}

/// A list of hooks run in registration order.
#[derive(Default)]
pub struct HookList {
    hooks: Vec<Box<dyn Hook>>,
}

impl std::fmt::Debug for HookList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

impl HookList {
    /// Creates a new empty hook list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook to the list.
    pub fn add<H: Hook + 'static>(&mut self, hook: H) {
        self.hooks.push(Box::new(hook));
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs `before_iteration` on all hooks.
    pub fn before_iteration(&mut self, iteration: usize) -> HookResult<()> {
        for hook in &mut self.hooks {
            hook.before_iteration(iteration)?;
        }
        Ok(())
    }

    /// Runs `after_iteration` on all hooks.
    pub fn after_iteration(&mut self, metrics: &EpochMetrics) -> HookResult<()> {
        for hook in &mut self.hooks {
            hook.after_iteration(metrics)?;
        }
        Ok(())
    }

    /// Runs `end` on all hooks.
    pub fn end(&mut self, report: &TrainReport) -> HookResult<()> {
        for hook in &mut self.hooks {
            hook.end(report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    }

    impl Hook for Recorder {
        fn name(&self) -> &str {
            self.tag
        }

        fn before_iteration(&mut self, iteration: usize) -> HookResult<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:before:{}", self.tag, iteration));
            Ok(())
        }

        fn after_iteration(&mut self, metrics: &EpochMetrics) -> HookResult<()> {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}:after:{}", self.tag, metrics.iteration));
            Ok(())
        }
    }

    struct Failing;

    impl Hook for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn after_iteration(&mut self, _metrics: &EpochMetrics) -> HookResult<()> {
            Err(HookError::Custom("boom".to_string()))
        }
    }

    fn metrics(iteration: usize) -> EpochMetrics {
        EpochMetrics {
            iteration,
            loss: 0.5,
            last_loss: None,
            rmse: 1.0,
            num_entries: 1,
        }
    }

    #[test]
    fn test_logging_hook_schedule() {
        let hook = LoggingHook::new(5);
        assert!(hook.should_log(1));
        assert!(!hook.should_log(3));
        assert!(hook.should_log(10));

        let hook = LoggingHook::new(5).with_log_first_iteration(false);
        assert!(!hook.should_log(1));

        let mut hook = LoggingHook::new(0);
        assert!(hook.after_iteration(&metrics(7)).is_ok());
    }

    #[test]
    fn test_hook_list_runs_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookList::new();
        hooks.add(Recorder {
            events: events.clone(),
            tag: "a",
        });
        hooks.add(Recorder {
            events: events.clone(),
            tag: "b",
        });
        assert_eq!(hooks.len(), 2);

        hooks.before_iteration(1).unwrap();
        hooks.after_iteration(&metrics(1)).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["a:before:1", "b:before:1", "a:after:1", "b:after:1"]
        );
    }

    #[test]
    fn test_hook_error_stops_the_list() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookList::new();
        hooks.add(Failing);
        hooks.add(Recorder {
            events: events.clone(),
            tag: "late",
        });

        let err = hooks.after_iteration(&metrics(1)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(events.lock().unwrap().is_empty());
    }
}
