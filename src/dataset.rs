use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

use crate::utils::{validate_test_size, AnalysisError};

/// Embedded copy of the Boston house-price table (506 rows, 13 features + MEDV)
static BOSTON_CSV: &str = include_str!("../data/boston.csv");

/// Name of the price column in the Boston table
pub const TARGET_NAME: &str = "MEDV";

/// Feature columns of the Boston table, in file order
pub const FEATURE_NAMES: [&str; 13] = [
    "CRIM", "ZN", "INDUS", "CHAS", "NOX", "RM", "AGE", "DIS", "RAD", "TAX", "PTRATIO", "B",
    "LSTAT",
];

/// The house whose price the tuned model and the neighbor baseline estimate
pub const SAMPLE_HOUSE: [f64; 13] = [
    11.95, 0.00, 18.100, 0.0, 0.6590, 5.6090, 90.00, 1.385, 24.0, 680.0, 20.20, 332.09, 12.13,
];

/// A numeric table: one feature row and one target value per record
#[derive(Debug, Clone, PartialEq)]
pub struct HousingData {
    pub name: String,
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub features: Array2<f64>,
    pub target: Array1<f64>,
}

impl HousingData {
    /// Create a dataset, checking that rows, targets and names line up
    pub fn new(
        name: impl Into<String>,
        feature_names: Vec<String>,
        features: Array2<f64>,
        target: Array1<f64>,
    ) -> Result<Self, AnalysisError> {
        if features.nrows() != target.len() {
            return Err(AnalysisError::ValidationError(format!(
                "feature rows ({}) must match target length ({})",
                features.nrows(),
                target.len()
            )));
        }
        if feature_names.len() != features.ncols() {
            return Err(AnalysisError::ValidationError(format!(
                "{} feature names given for {} feature columns",
                feature_names.len(),
                features.ncols()
            )));
        }

        Ok(Self {
            name: name.into(),
            feature_names,
            target_name: "target".to_string(),
            features,
            target,
        })
    }

    /// Load the embedded Boston housing table
    pub fn boston() -> crate::Result<Self> {
        Self::from_csv("boston", BOSTON_CSV, TARGET_NAME)
    }

    /// Load a dataset from a CSV file on disk
    pub fn from_path(path: &Path, target: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::DatasetError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());
        Self::from_csv(name, &content, target)
    }

    /// Load dataset from CSV text with a header row
    ///
    /// Every column except `target` becomes a feature, in header order.
    /// All cells must parse as numbers.
    pub fn from_csv(name: impl Into<String>, csv_data: &str, target: &str) -> crate::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers = reader.headers()?.clone();
        let target_idx = headers.iter().position(|h| h == target).ok_or_else(|| {
            AnalysisError::DatasetError(format!("target column '{}' not found", target))
        })?;

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut values: Vec<f64> = Vec::new();
        let mut targets: Vec<f64> = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            for (col_idx, field) in record.iter().enumerate() {
                let value: f64 = field.parse().map_err(|_| {
                    AnalysisError::DatasetError(format!(
                        "row {}: column '{}' is not numeric: '{}'",
                        row_idx + 1,
                        headers.get(col_idx).unwrap_or("?"),
                        field
                    ))
                })?;
                if col_idx == target_idx {
                    targets.push(value);
                } else {
                    values.push(value);
                }
            }
        }

        if targets.is_empty() {
            return Err(AnalysisError::DatasetError("no data rows found".to_string()).into());
        }

        let features = Array2::from_shape_vec((targets.len(), feature_names.len()), values)
            .map_err(|e| AnalysisError::DatasetError(format!("ragged CSV rows: {}", e)))?;

        Ok(Self::new(name, feature_names, features, Array1::from_vec(targets))?.with_target_name(target))
    }

    /// Rename the target column
    pub fn with_target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = name.into();
        self
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of feature cells (rows x columns)
    pub fn size(&self) -> usize {
        self.features.len()
    }

    /// Copy out the rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Array1<f64>) {
        (
            self.features.select(Axis(0), indices),
            self.target.select(Axis(0), indices),
        )
    }

    /// Randomly partition the rows into train and test subsets
    ///
    /// The test partition gets `ceil(test_size * n)` rows, the train
    /// partition the remainder.
    pub fn train_test_split<R: Rng + ?Sized>(
        &self,
        test_size: f64,
        rng: &mut R,
    ) -> Result<TrainTestSplit, AnalysisError> {
        validate_test_size(test_size)?;

        let n_samples = self.len();
        let n_test = (test_size * n_samples as f64).ceil() as usize;
        if n_test == 0 || n_test >= n_samples {
            return Err(AnalysisError::ValidationError(format!(
                "test_size {} leaves an empty partition for {} samples",
                test_size, n_samples
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        indices.shuffle(rng);

        let n_train = n_samples - n_test;
        let test_indices = indices.split_off(n_train);
        let train_indices = indices;

        let (x_train, y_train) = self.select(&train_indices);
        let (x_test, y_test) = self.select(&test_indices);

        Ok(TrainTestSplit {
            x_train,
            y_train,
            x_test,
            y_test,
            train_indices,
            test_indices,
        })
    }
}

/// Disjoint train/test partitions of a dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    /// Number of training rows
    pub fn n_train(&self) -> usize {
        self.y_train.len()
    }

    /// Number of test rows
    pub fn n_test(&self) -> usize {
        self.y_test.len()
    }
}
