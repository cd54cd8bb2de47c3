//! Learning and model-complexity error curves

use linfa::traits::Predict;
use ndarray::{s, Array1};
use tracing::debug;

use super::metrics::PerformanceMetric;
use super::tree::DecisionTreeParams;
use crate::dataset::TrainTestSplit;
use crate::utils::{validate_at_least, validate_depths, AnalysisError};

pub const LEARNING_CURVE_TITLE: &str = "Decision Trees: Performance vs Training Size";
pub const COMPLEXITY_CURVE_TITLE: &str = "Decision Trees: Performance vs Max Depth";

/// Training and test error measured along one varying quantity
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorCurve {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<f64>,
    pub train_error: Vec<f64>,
    pub test_error: Vec<f64>,
}

impl ErrorCurve {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// `points` training sizes spread evenly over `1..=n_train`
///
/// Sizes are rounded half-to-even, matching `round(linspace(1, n, points))`.
pub fn training_sizes(n_train: usize, points: usize) -> Vec<usize> {
    match points {
        0 => Vec::new(),
        1 => vec![n_train.max(1)],
        _ => {
            let start = 1.0;
            let stop = n_train as f64;
            let step = (stop - start) / (points - 1) as f64;
            (0..points)
                .map(|i| {
                    let value = if i == points - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    };
                    value.round_ties_even().max(1.0) as usize
                })
                .collect()
        }
    }
}

/// Fit trees of a fixed depth on growing prefixes of the training rows
///
/// Training error is measured on the prefix the tree saw, test error on the
/// full test partition.
pub fn learning_curve(
    depth: usize,
    split: &TrainTestSplit,
    metric: PerformanceMetric,
    points: usize,
    params: &DecisionTreeParams,
) -> Result<ErrorCurve, AnalysisError> {
    validate_depths("learning curve depth", &[depth])?;
    validate_at_least("learning curve points", points, 1)?;

    let sizes = training_sizes(split.n_train(), points);
    let params = params.clone().with_max_depth(depth);

    let mut train_error = Vec::with_capacity(sizes.len());
    let mut test_error = Vec::with_capacity(sizes.len());

    for &size in &sizes {
        let x = split.x_train.slice(s![..size, ..]).to_owned();
        let y = split.y_train.slice(s![..size]).to_owned();

        let model = params.fit_arrays(&x, &y)?;
        let train_pred: Array1<f64> = model.predict(&x);
        let test_pred: Array1<f64> = model.predict(&split.x_test);

        train_error.push(metric.compute(&y, &train_pred)?);
        test_error.push(metric.compute(&split.y_test, &test_pred)?);
    }

    debug!(depth, points = sizes.len(), "learning curve computed");

    Ok(ErrorCurve {
        title: format!("{} (max depth {})", LEARNING_CURVE_TITLE, depth),
        x_label: "Training Size".to_string(),
        y_label: "Error".to_string(),
        x: sizes.iter().map(|&s| s as f64).collect(),
        train_error,
        test_error,
    })
}

/// Fit one tree per depth on the full training partition
pub fn model_complexity(
    depths: &[usize],
    split: &TrainTestSplit,
    metric: PerformanceMetric,
    params: &DecisionTreeParams,
) -> Result<ErrorCurve, AnalysisError> {
    validate_depths("complexity depths", depths)?;

    let mut train_error = Vec::with_capacity(depths.len());
    let mut test_error = Vec::with_capacity(depths.len());

    for &depth in depths {
        let model = params
            .clone()
            .with_max_depth(depth)
            .fit_arrays(&split.x_train, &split.y_train)?;

        let train_pred: Array1<f64> = model.predict(&split.x_train);
        let test_pred: Array1<f64> = model.predict(&split.x_test);

        train_error.push(metric.compute(&split.y_train, &train_pred)?);
        test_error.push(metric.compute(&split.y_test, &test_pred)?);
    }

    debug!(depths = depths.len(), "model complexity computed");

    Ok(ErrorCurve {
        title: COMPLEXITY_CURVE_TITLE.to_string(),
        x_label: "Max Depth".to_string(),
        y_label: "Error".to_string(),
        x: depths.iter().map(|&d| d as f64).collect(),
        train_error,
        test_error,
    })
}
