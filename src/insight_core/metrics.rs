//! Regression error metrics used to score fitted trees.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::stats::percentile;
use crate::utils::AnalysisError;

/// Performance metric comparing true prices against predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    /// mean(|y - p|)
    #[default]
    MeanAbsoluteError,
    /// mean((y - p)^2)
    MeanSquaredError,
    /// median(|y - p|)
    MedianAbsoluteError,
    /// 1 - SS_res / SS_tot
    R2,
    /// 1 - Var(y - p) / Var(y)
    ExplainedVariance,
}

impl PerformanceMetric {
    /// Short name used in reports and config files
    pub fn name(&self) -> &'static str {
        match self {
            PerformanceMetric::MeanAbsoluteError => "mean_absolute_error",
            PerformanceMetric::MeanSquaredError => "mean_squared_error",
            PerformanceMetric::MedianAbsoluteError => "median_absolute_error",
            PerformanceMetric::R2 => "r2",
            PerformanceMetric::ExplainedVariance => "explained_variance",
        }
    }

    /// Whether a larger metric value means a better model
    pub fn greater_is_better(&self) -> bool {
        matches!(
            self,
            PerformanceMetric::R2 | PerformanceMetric::ExplainedVariance
        )
    }

    /// Compute the raw metric value
    pub fn compute(&self, truth: &Array1<f64>, predicted: &Array1<f64>) -> Result<f64, AnalysisError> {
        if truth.is_empty() {
            return Err(AnalysisError::ValidationError(
                "cannot score an empty prediction set".to_string(),
            ));
        }
        if truth.len() != predicted.len() {
            return Err(AnalysisError::ValidationError(format!(
                "truth length ({}) must match prediction length ({})",
                truth.len(),
                predicted.len()
            )));
        }

        let n = truth.len() as f64;
        let residuals: Vec<f64> = truth
            .iter()
            .zip(predicted.iter())
            .map(|(t, p)| t - p)
            .collect();

        let value = match self {
            PerformanceMetric::MeanAbsoluteError => {
                residuals.iter().map(|r| r.abs()).sum::<f64>() / n
            }
            PerformanceMetric::MeanSquaredError => {
                residuals.iter().map(|r| r * r).sum::<f64>() / n
            }
            PerformanceMetric::MedianAbsoluteError => {
                let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
                abs.sort_by(|a, b| a.total_cmp(b));
                percentile(&abs, 50.0)
            }
            PerformanceMetric::R2 => {
                let mean = truth.sum() / n;
                let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
                let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
                unit_fraction_score(ss_res, ss_tot)
            }
            PerformanceMetric::ExplainedVariance => {
                let mean_res = residuals.iter().sum::<f64>() / n;
                let var_res = residuals.iter().map(|r| (r - mean_res).powi(2)).sum::<f64>() / n;
                let mean = truth.sum() / n;
                let var_truth = truth.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
                unit_fraction_score(var_res, var_truth)
            }
        };

        Ok(value)
    }

    /// Metric value oriented so that greater is always better
    ///
    /// Loss metrics are negated, as a scorer built with
    /// `greater_is_better = false` would do.
    pub fn score(&self, truth: &Array1<f64>, predicted: &Array1<f64>) -> Result<f64, AnalysisError> {
        let value = self.compute(truth, predicted)?;
        Ok(if self.greater_is_better() { value } else { -value })
    }
}

/// 1 - num / den, with a constant target scoring 1 on a perfect fit and 0 otherwise
fn unit_fraction_score(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        if num == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - num / den
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PerformanceMetric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mae" | "mean_absolute_error" => Ok(PerformanceMetric::MeanAbsoluteError),
            "mse" | "mean_squared_error" => Ok(PerformanceMetric::MeanSquaredError),
            "medae" | "median_absolute_error" => Ok(PerformanceMetric::MedianAbsoluteError),
            "r2" => Ok(PerformanceMetric::R2),
            "explained_variance" => Ok(PerformanceMetric::ExplainedVariance),
            other => Err(AnalysisError::ValidationError(format!(
                "unknown metric '{}'",
                other
            ))),
        }
    }
}
