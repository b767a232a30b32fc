//! Offline training: CSV in, evaluated model file out.

use anyhow::{Context, bail};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use yansi::Paint;

use super::dataset::Dataset;
use super::features::FEATURE_NAMES;
use super::forest::{ForestParams, MultiOutputForest};
use super::metrics::{mean_absolute_error, multi_output_r2, r2_score};
use super::risk::RiskKind;
use crate::utils::fmt_duration;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub dataset: PathBuf,
    pub output: PathBuf,
    pub params: ForestParams,
    pub test_fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetScore {
    pub target: String,
    pub r2: f64,
    pub mae: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub overall_r2: f64,
    pub targets: Vec<TargetScore>,
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Score `model` against a held-out set.
pub fn evaluate(model: &MultiOutputForest, test: &Dataset) -> anyhow::Result<(f64, Vec<TargetScore>)> {
    let predictions = test
        .features
        .iter()
        .map(|row| model.predict_row(row))
        .collect::<Result<Vec<_>, _>>()?;

    let targets: Vec<TargetScore> = model
        .target_names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let y_true = test.target_column(j);
            let y_pred: Vec<f64> = predictions.iter().map(|p| p[j]).collect();
            TargetScore {
                target: name.clone(),
                r2: r2_score(&y_true, &y_pred),
                mae: mean_absolute_error(&y_true, &y_pred),
            }
        })
        .collect();

    let per_output: Vec<f64> = targets.iter().map(|t| t.r2).collect();
    Ok((multi_output_r2(&per_output), targets))
}

/// Load the dataset, fit on the training split, report held-out scores and save.
pub fn train(options: &TrainOptions) -> anyhow::Result<TrainingReport> {
    let start = Instant::now();

    if !(options.test_fraction > 0.0 && options.test_fraction < 1.0) {
        bail!(
            "test fraction must be between 0 and 1, got {}",
            options.test_fraction
        );
    }

    let dataset = Dataset::from_csv(&options.dataset)
        .with_context(|| format!("Failed to load dataset {}", options.dataset.display()))?;
    info!(rows = dataset.len(), path = %options.dataset.display(), "dataset loaded");

    let (train_set, test_set) = dataset.train_test_split(options.test_fraction, options.params.seed);
    if train_set.is_empty() || test_set.is_empty() {
        bail!(
            "dataset has {} rows, too few to hold out a test split",
            dataset.len()
        );
    }

    let model = MultiOutputForest::fit(
        &train_set.features,
        &train_set.targets,
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        RiskKind::ALL
            .iter()
            .map(|k| k.target_column().to_string())
            .collect(),
        &options.params,
    )
    .context("Failed to fit model")?;

    let (overall_r2, targets) = evaluate(&model, &test_set)?;

    model
        .save(&options.output)
        .with_context(|| format!("Failed to save model to {}", options.output.display()))?;

    let elapsed = start.elapsed();
    info!(
        overall_r2,
        output = %options.output.display(),
        duration = fmt_duration(elapsed),
        "model saved"
    );

    Ok(TrainingReport {
        train_rows: train_set.len(),
        test_rows: test_set.len(),
        overall_r2,
        targets,
        output: options.output.clone(),
        elapsed,
    })
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Trained on {} rows, evaluated on {} rows in {}",
            self.train_rows,
            self.test_rows,
            fmt_duration(self.elapsed)
        )?;
        writeln!(
            f,
            "Overall R² on test data: {}",
            format!("{:.4}", self.overall_r2).green().bold()
        )?;
        for t in &self.targets {
            writeln!(f, "  MAE for {}: {:.2} (R² {:.4})", t.target, t.mae, t.r2)?;
        }
        write!(
            f,
            "Model saved to {}",
            self.output.display().to_string().cyan()
        )
    }
}
