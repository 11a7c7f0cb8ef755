//! Trains a factorization machine on synthetic ratings and reports the fit.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sparsefm_examples::synthetic_ratings;
use sparsefm_model::{InteractionKind, ModelConfig};
use sparsefm_optimizer::OptimizerConfig;
use sparsefm_training::{ConvergencePolicy, LoggingHook, Trainer, TrainerConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelKind {
    Fm,
    Ffm,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OptimizerKind {
    Sgd,
    Ftrl,
}

#[derive(Parser, Debug)]
#[command(about = "Train FM-SGD, FM-FTRL or FFM on a synthetic rating tensor")]
struct Args {
    /// Read the trainer configuration from a JSON file instead of flags.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    dump_config: bool,

    #[arg(long, value_enum, default_value_t = ModelKind::Fm)]
    model: ModelKind,

    #[arg(long, value_enum, default_value_t = OptimizerKind::Sgd)]
    optimizer: OptimizerKind,

    /// Latent dimensions per feature (or per feature and field).
    #[arg(long, default_value_t = 4)]
    factors: usize,

    #[arg(long, default_value_t = 100)]
    iterations: usize,

    /// Early-stopping tolerance on the absolute loss change; 0 disables it.
    #[arg(long, default_value_t = 1e-5)]
    tolerance: f64,

    /// SGD learning rate.
    #[arg(long, default_value_t = 0.01)]
    learning_rate: f64,

    /// SGD L2 weight applied to bias, weights and factors.
    #[arg(long, default_value_t = 0.0)]
    reg: f64,

    #[arg(long, default_value_t = 0.1)]
    alpha: f64,

    #[arg(long, default_value_t = 1.0)]
    beta: f64,

    #[arg(long, default_value_t = 0.0)]
    lambda1: f64,

    #[arg(long, default_value_t = 0.0)]
    lambda2: f64,

    /// Cardinality of each field, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = vec![50, 40, 4])]
    dimensions: Vec<usize>,

    #[arg(long, default_value_t = 2000)]
    entries: usize,

    #[arg(long, default_value_t = 0.1)]
    noise: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 10)]
    log_every: usize,
}

impl Args {
    fn trainer_config(&self) -> anyhow::Result<TrainerConfig> {
        if let Some(path) = &self.config {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()));
        }

        let interaction = match self.model {
            ModelKind::Fm => InteractionKind::Factorization,
            ModelKind::Ffm => InteractionKind::FieldAware,
        };
        let optimizer = match self.optimizer {
            OptimizerKind::Sgd => OptimizerConfig::Sgd {
                learning_rate: self.learning_rate,
                reg_bias: self.reg,
                reg_linear: self.reg,
                reg_factor: self.reg,
            },
            OptimizerKind::Ftrl => OptimizerConfig::Ftrl {
                alpha: self.alpha,
                beta: self.beta,
                lambda1: self.lambda1,
                lambda2: self.lambda2,
            },
        };
        let convergence = if self.tolerance > 0.0 {
            ConvergencePolicy::absolute(self.tolerance)
        } else {
            ConvergencePolicy::RunToCompletion
        };

        Ok(TrainerConfig::default()
            .with_model(
                ModelConfig::new(self.factors)
                    .with_interaction(interaction)
                    .with_seed(self.seed),
            )
            .with_optimizer(optimizer)
            .with_num_iterations(self.iterations)
            .with_convergence(convergence))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let config = args.trainer_config()?;
    config.validate()?;
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let data = synthetic_ratings(&args.dimensions, args.entries, args.noise, args.seed)?;
    info!(
        entries = data.len(),
        dimensions = ?data.dimensions(),
        "generated synthetic ratings"
    );

    let mut trainer = Trainer::from_cardinalities(config, data.dimensions())?;
    trainer.add_hook(LoggingHook::new(args.log_every));
    let report = trainer.train(&data)?;

    let model = trainer.into_model();
    let mut squared_error = 0.0;
    for entry in data.iter() {
        let prediction = model.predict_keys(&entry.keys)?;
        squared_error += (prediction - entry.label).powi(2);
    }
    let rmse = (squared_error / data.len().max(1) as f64).sqrt();

    info!(
        state = ?report.state,
        iterations = report.iterations,
        final_loss = report.final_loss().unwrap_or(f64::NAN),
        rmse,
        "demo_train finished"
    );
    Ok(())
}
