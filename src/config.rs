//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dataset::SAMPLE_HOUSE;
use crate::insight_core::PerformanceMetric;
use crate::utils::{validate_at_least, validate_depths, validate_test_size, AnalysisError};

/// Every tunable of the analysis pipeline
///
/// Missing JSON fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// One learning curve per depth
    pub learning_curve_depths: Vec<usize>,
    /// Training sizes per learning curve
    pub learning_curve_points: usize,
    pub complexity_depths: Vec<usize>,
    /// Candidate depths for the grid search
    pub grid_depths: Vec<usize>,
    /// Folds used when tuning the reported model
    pub final_cv_folds: usize,
    /// Folds used by each repeated run
    pub repeat_cv_folds: usize,
    pub repeats: usize,
    pub n_neighbors: usize,
    pub metric: PerformanceMetric,
    /// House to price
    pub sample: Vec<f64>,
    /// Seed for every random choice; entropy when absent
    pub seed: Option<u64>,
    /// Evaluate grid candidates on the rayon pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            test_size: 0.3,
            learning_curve_depths: (1..=10).collect(),
            learning_curve_points: 50,
            complexity_depths: (1..=24).collect(),
            grid_depths: (1..=10).collect(),
            final_cv_folds: 50,
            repeat_cv_folds: 3,
            repeats: 30,
            n_neighbors: 10,
            metric: PerformanceMetric::default(),
            sample: SAMPLE_HOUSE.to_vec(),
            seed: None,
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::ValidationError(format!("failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), AnalysisError> {
        validate_test_size(self.test_size)?;
        validate_depths("learning_curve_depths", &self.learning_curve_depths)?;
        validate_at_least("learning_curve_points", self.learning_curve_points, 1)?;
        validate_depths("complexity_depths", &self.complexity_depths)?;
        validate_depths("grid_depths", &self.grid_depths)?;
        validate_at_least("final_cv_folds", self.final_cv_folds, 2)?;
        validate_at_least("repeat_cv_folds", self.repeat_cv_folds, 2)?;
        validate_at_least("repeats", self.repeats, 1)?;
        validate_at_least("n_neighbors", self.n_neighbors, 1)?;

        if self.sample.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::ValidationError(
                "sample contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}
