//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::forest::ForestParams;

#[derive(Debug, Parser)]
#[command(name = "healthrisk", version, about = "Health risk prediction service")]
pub struct Args {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = default_tracing_format(), global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[derive(Debug, Clone, Subcommand, Default)]
pub enum Command {
    /// Run the web application (default).
    #[default]
    Serve,
    /// Train the risk model from a CSV dataset and write it to disk.
    Train(TrainArgs),
    /// List registered users.
    Users,
    /// Dump every stored prediction.
    Predictions,
}

#[derive(Debug, Clone, clap::Args)]
pub struct TrainArgs {
    /// Path to the training CSV.
    #[arg(long, default_value = "Health_Risk_Prediction_2000_Rows.csv")]
    pub dataset: PathBuf,

    /// Where to write the trained model. Defaults to `MODEL_PATH`.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Trees per target.
    #[arg(long, default_value_t = 200)]
    pub trees: usize,

    #[arg(long)]
    pub max_depth: Option<usize>,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of rows held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,
}

impl TrainArgs {
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.trees,
            max_depth: self.max_depth,
            seed: self.seed,
            ..ForestParams::default()
        }
    }
}
