//! Health risk model: feature encoding, the random forest regressor, and the
//! offline training pipeline.

pub mod dataset;
pub mod features;
pub mod forest;
pub mod metrics;
pub mod risk;
pub mod train;

use serde::Serialize;

pub use features::{FEATURE_COUNT, HealthMetrics};
pub use forest::MultiOutputForest;
pub use risk::{RISK_COUNT, RiskAssessment, RiskKind};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("expected {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },
    #[error("model has {got} outputs, expected {expected}")]
    OutputCount { expected: usize, got: usize },
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("features and targets have different lengths ({features} vs {targets})")]
    ShapeMismatch { features: usize, targets: usize },
    #[error("unsupported model format version {found} (expected {expected})")]
    FormatVersion { found: u32, expected: u32 },
    #[error("model {axis} columns {found:?} do not match expected {expected:?}")]
    ColumnMismatch {
        axis: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("model file I/O failed")]
    Io(#[from] std::io::Error),
    #[error("model file is malformed")]
    Format(#[from] serde_json::Error),
}

/// Short description of a loaded model, reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub kind: String,
    pub n_features: usize,
    pub n_outputs: usize,
    pub n_estimators: usize,
    pub trained_at: Option<String>,
}

/// Anything that maps one encoded feature vector to the five risk percentages.
///
/// The web layer only depends on this trait so tests can swap in a fixed
/// predictor instead of a trained forest.
pub trait RiskPredictor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<[f64; RISK_COUNT], ModelError>;

    fn summary(&self) -> ModelSummary;

    /// Encode and predict in one step.
    fn assess(&self, metrics: &HealthMetrics) -> Result<RiskAssessment, ModelError> {
        let raw = self.predict(&metrics.to_features())?;
        Ok(RiskAssessment::from_prediction(raw))
    }
}
