//! Random forest regression, one forest per output.
//!
//! Trees are CART regressors grown on bootstrap samples, splitting on the
//! threshold that minimizes the summed squared error of the two children.
//! Every feature is considered at every split. Trees are stored as flat
//! parallel arrays (`feature < 0` marks a leaf) so a serialized model stays
//! compact and prediction is a tight loop.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::features::FEATURE_NAMES;
use super::risk::RiskKind;
use super::{ModelError, ModelSummary, RISK_COUNT, RiskPredictor};

/// Bumped whenever the serialized layout changes.
pub const FORMAT_VERSION: u32 = 1;

const LEAF: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    /// Nodes with fewer samples than this become leaves.
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

/// A single regression tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionTree {
    feature: Vec<i32>,
    threshold: Vec<f64>,
    left: Vec<u32>,
    right: Vec<u32>,
    value: Vec<f64>,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: &'a ForestParams,
    tree: RegressionTree,
    pairs: Vec<(f64, f64)>,
}

impl RegressionTree {
    /// Fit on the rows named by `samples` (duplicates allowed, as in a bootstrap).
    pub fn fit(x: &[Vec<f64>], y: &[f64], samples: &mut [usize], params: &ForestParams) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            params,
            tree: RegressionTree::default(),
            pairs: Vec::with_capacity(samples.len()),
        };
        if !samples.is_empty() {
            builder.grow(samples, 0);
        }
        builder.tree
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.value.is_empty() {
            return 0.0;
        }
        let mut node = 0usize;
        loop {
            let feature = self.feature[node];
            if feature == LEAF {
                return self.value[node];
            }
            node = if row[feature as usize] <= self.threshold[node] {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
    }

    pub fn node_count(&self) -> usize {
        self.value.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(tree: &RegressionTree, node: usize) -> usize {
            if tree.feature[node] == LEAF {
                0
            } else {
                1 + walk(tree, tree.left[node] as usize).max(walk(tree, tree.right[node] as usize))
            }
        }
        if self.value.is_empty() { 0 } else { walk(self, 0) }
    }

    fn push_leaf(&mut self, value: f64) -> usize {
        self.feature.push(LEAF);
        self.threshold.push(0.0);
        self.left.push(0);
        self.right.push(0);
        self.value.push(value);
        self.value.len() - 1
    }
}

impl TreeBuilder<'_> {
    fn grow(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let n = samples.len();
        let sum: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let mean = sum / n as f64;
        let node = self.tree.push_leaf(mean);

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let pure = samples.iter().all(|&i| self.y[i] == self.y[samples[0]]);
        if depth_reached || pure || n < self.params.min_samples_split.max(2) {
            return node;
        }

        let Some((feature, threshold)) = self.best_split(samples, sum) else {
            return node;
        };

        // Partition in place: rows going left first.
        let mut split = 0;
        for k in 0..n {
            if self.x[samples[k]][feature] <= threshold {
                samples.swap(k, split);
                split += 1;
            }
        }
        let (left_samples, right_samples) = samples.split_at_mut(split);

        let left = self.grow(left_samples, depth + 1);
        let right = self.grow(right_samples, depth + 1);

        self.tree.feature[node] = feature as i32;
        self.tree.threshold[node] = threshold;
        self.tree.left[node] = left as u32;
        self.tree.right[node] = right as u32;
        node
    }

    /// Find the split maximizing `S_l²/n_l + S_r²/n_r`, which is equivalent
    /// to minimizing the children's summed squared error.
    fn best_split(&mut self, samples: &[usize], total: f64) -> Option<(usize, f64)> {
        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n_features = self.x[samples[0]].len();
        let parent_score = total * total / n as f64;

        let mut best: Option<(usize, f64)> = None;
        let mut best_score = parent_score;

        for feature in 0..n_features {
            self.pairs.clear();
            self.pairs
                .extend(samples.iter().map(|&i| (self.x[i][feature], self.y[i])));
            self.pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += self.pairs[k].1;
                let (lo, hi) = (self.pairs[k].0, self.pairs[k + 1].0);
                if lo == hi {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let right_sum = total - left_sum;
                let score =
                    left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if score > best_score + 1e-9 * best_score.abs().max(1.0) {
                    best_score = score;
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some((feature, threshold));
                }
            }
        }

        best
    }
}

/// Bagged ensemble of regression trees for a single output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self, ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(ModelError::ShapeMismatch {
                features: x.len(),
                targets: y.len(),
            });
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut samples = vec![0usize; n];
        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                for slot in samples.iter_mut() {
                    *slot = rng.random_range(0..n);
                }
                RegressionTree::fit(x, y, &mut samples, params)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

/// One independent [`RandomForest`] per target, sharing the same inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiOutputForest {
    format_version: u32,
    pub feature_names: Vec<String>,
    pub target_names: Vec<String>,
    pub params: ForestParams,
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    forests: Vec<RandomForest>,
}

impl MultiOutputForest {
    /// Fit one forest per target column. `targets[i]` holds every output for row `i`.
    ///
    /// Forests are independent, so each is fit on its own thread.
    pub fn fit(
        x: &[Vec<f64>],
        targets: &[Vec<f64>],
        feature_names: Vec<String>,
        target_names: Vec<String>,
        params: &ForestParams,
    ) -> Result<Self, ModelError> {
        if x.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if x.len() != targets.len() {
            return Err(ModelError::ShapeMismatch {
                features: x.len(),
                targets: targets.len(),
            });
        }
        let n_features = feature_names.len();
        if let Some(row) = x.iter().find(|row| row.len() != n_features) {
            return Err(ModelError::FeatureCount {
                expected: n_features,
                got: row.len(),
            });
        }
        let n_outputs = target_names.len();
        if let Some(row) = targets.iter().find(|row| row.len() != n_outputs) {
            return Err(ModelError::OutputCount {
                expected: n_outputs,
                got: row.len(),
            });
        }

        let columns: Vec<Vec<f64>> = (0..n_outputs)
            .map(|j| targets.iter().map(|row| row[j]).collect())
            .collect();

        let forests = std::thread::scope(|s| {
            let handles: Vec<_> = columns
                .iter()
                .zip(&target_names)
                .map(|(y, name)| {
                    s.spawn(move || {
                        let forest = RandomForest::fit(x, y, params);
                        debug!(target = %name, "forest fitted");
                        forest
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Result<Vec<_>, _>>()
        })?;

        info!(
            samples = x.len(),
            features = n_features,
            outputs = n_outputs,
            trees_per_output = params.n_estimators,
            "multi-output forest trained"
        );

        Ok(Self {
            format_version: FORMAT_VERSION,
            feature_names,
            target_names,
            params: params.clone(),
            trained_at: Utc::now(),
            n_samples: x.len(),
            forests,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.feature_names.len() {
            return Err(ModelError::FeatureCount {
                expected: self.feature_names.len(),
                got: row.len(),
            });
        }
        Ok(self.forests.iter().map(|f| f.predict(row)).collect())
    }

    pub fn forests(&self) -> &[RandomForest] {
        &self.forests
    }

    /// Write as JSON. The file is written beside the target and renamed into
    /// place so a running server never reads a half-written model.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let model: Self = serde_json::from_reader(reader)?;
        if model.format_version != FORMAT_VERSION {
            return Err(ModelError::FormatVersion {
                found: model.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if model.forests.len() != model.target_names.len() {
            return Err(ModelError::OutputCount {
                expected: model.target_names.len(),
                got: model.forests.len(),
            });
        }
        Ok(model)
    }

    /// [`load`](Self::load) a model for serving: its feature and target
    /// columns must be the questionnaire fields and risk targets, in order.
    pub fn load_risk_model(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let model = Self::load(path)?;
        let targets: Vec<&str> = RiskKind::ALL.iter().map(|k| k.target_column()).collect();
        check_columns("feature", &FEATURE_NAMES, &model.feature_names)?;
        check_columns("target", &targets, &model.target_names)?;
        Ok(model)
    }
}

fn check_columns(axis: &'static str, expected: &[&str], found: &[String]) -> Result<(), ModelError> {
    if expected.iter().eq(found.iter()) {
        return Ok(());
    }
    Err(ModelError::ColumnMismatch {
        axis,
        expected: expected.iter().map(|s| s.to_string()).collect(),
        found: found.to_vec(),
    })
}

impl RiskPredictor for MultiOutputForest {
    fn predict(&self, features: &[f64]) -> Result<[f64; RISK_COUNT], ModelError> {
        let outputs = self.predict_row(features)?;
        let got = outputs.len();
        outputs.try_into().map_err(|_| ModelError::OutputCount {
            expected: RISK_COUNT,
            got,
        })
    }

    fn summary(&self) -> ModelSummary {
        ModelSummary {
            kind: "random_forest".to_string(),
            n_features: self.feature_names.len(),
            n_outputs: self.target_names.len(),
            n_estimators: self.params.n_estimators,
            trained_at: Some(self.trained_at.to_rfc3339()),
        }
    }
}
