//! Training data loaded from CSV.
//!
//! Columns are matched by header name, so column order and any extra columns
//! in the file are irrelevant. Categorical cells use the same labels as the
//! web form and are encoded by [`HealthMetrics::to_features`].

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::features::{FEATURE_NAMES, FeatureError, HealthMetrics};
use super::risk::{RISK_COUNT, RiskKind};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("CSV is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: FeatureError,
    },
    #[error("row {row}: column '{column}' has invalid value '{value}'")]
    InvalidTarget {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv_reader(reader)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, DatasetError> {
        Self::from_csv_reader(csv::Reader::from_reader(input))
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, DatasetError> {
        let headers = reader.headers()?.clone();
        let columns: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim(), i))
            .collect();

        let required = FEATURE_NAMES
            .iter()
            .copied()
            .chain(RiskKind::ALL.iter().map(|k| k.target_column()));
        for name in required {
            if !columns.contains_key(name) {
                return Err(DatasetError::MissingColumn(name));
            }
        }

        let mut dataset = Dataset::default();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1.
            let row = index + 2;
            let cell = |name: &str| columns.get(name).and_then(|&i| record.get(i));

            let metrics =
                HealthMetrics::from_lookup(cell).map_err(|source| DatasetError::Row { row, source })?;

            let mut targets = Vec::with_capacity(RISK_COUNT);
            for kind in RiskKind::ALL {
                let column = kind.target_column();
                let raw = cell(column).unwrap_or_default().trim();
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| DatasetError::InvalidTarget {
                        row,
                        column,
                        value: raw.to_string(),
                    })?;
                targets.push(value);
            }

            dataset.features.push(metrics.to_features().to_vec());
            dataset.targets.push(targets);
        }

        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Target values for one output across all rows.
    pub fn target_column(&self, output: usize) -> Vec<f64> {
        self.targets.iter().map(|row| row[output]).collect()
    }

    /// Shuffle rows with `seed` and hold out `ceil(len * test_fraction)` rows.
    ///
    /// Returns `(train, test)`.
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> (Dataset, Dataset) {
        let n = self.len();
        let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
        let n_test = n_test.min(n);

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let pick = |rows: &[usize]| Dataset {
            features: rows.iter().map(|&i| self.features[i].clone()).collect(),
            targets: rows.iter().map(|&i| self.targets[i].clone()).collect(),
        };
        let (test, train) = order.split_at(n_test);
        (pick(train), pick(test))
    }
}
