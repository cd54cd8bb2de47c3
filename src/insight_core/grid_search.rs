//! Exhaustive search over tree depths scored by cross-validation

use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use tracing::{debug, info};

use super::cross_validation::{CvSplit, KFold};
use super::feature::validate_training_data;
use super::metrics::PerformanceMetric;
use super::tree::{DecisionTreeParams, DecisionTreeRegressor};
use crate::utils::{validate_depths, AnalysisError};

/// Cross-validated score of one candidate depth
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub max_depth: usize,
    /// Mean of `fold_scores`; greater is better
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Outcome of a grid search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    /// Best candidate refitted on every row
    pub best_estimator: DecisionTreeRegressor,
    pub best_depth: usize,
    pub best_score: f64,
    /// One entry per candidate, in search order
    pub candidates: Vec<CandidateScore>,
}

/// Grid search over `max_depth`
#[derive(Debug, Clone)]
pub struct GridSearch {
    depths: Vec<usize>,
    base_params: DecisionTreeParams,
    cv: KFold,
    metric: PerformanceMetric,
    parallel: bool,
}

impl GridSearch {
    /// Search the given depths with 3-fold CV and mean absolute error
    pub fn new(depths: Vec<usize>) -> Self {
        Self {
            depths,
            base_params: DecisionTreeParams::default(),
            cv: KFold::new(3),
            metric: PerformanceMetric::default(),
            parallel: true,
        }
    }

    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_metric(mut self, metric: PerformanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Parameters shared by every candidate; `max_depth` is overridden
    pub fn with_base_params(mut self, params: DecisionTreeParams) -> Self {
        self.base_params = params;
        self
    }

    /// Evaluate candidates on the rayon pool (default) or sequentially
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Score every candidate, pick the best and refit it on all rows
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<GridSearchResult, AnalysisError> {
        validate_depths("depth grid", &self.depths)?;
        validate_training_data(x, y)?;

        let splits = self.cv.split(x.nrows())?;
        info!(
            candidates = self.depths.len(),
            folds = splits.len(),
            metric = %self.metric,
            "running grid search"
        );

        let candidates: Vec<CandidateScore> = if self.parallel {
            self.depths
                .par_iter()
                .map(|&depth| self.evaluate(depth, x, y, &splits))
                .collect::<Result<_, _>>()?
        } else {
            self.depths
                .iter()
                .map(|&depth| self.evaluate(depth, x, y, &splits))
                .collect::<Result<_, _>>()?
        };

        // strict comparison keeps the earliest candidate on ties
        let mut best = &candidates[0];
        for candidate in &candidates[1..] {
            if candidate.mean_score > best.mean_score {
                best = candidate;
            }
        }
        let best_depth = best.max_depth;
        let best_score = best.mean_score;

        let best_estimator = self
            .base_params
            .clone()
            .with_max_depth(best_depth)
            .fit(&Dataset::new(x.clone(), y.clone()))?;

        info!(best_depth, best_score, "grid search finished");

        Ok(GridSearchResult {
            best_estimator,
            best_depth,
            best_score,
            candidates,
        })
    }

    fn evaluate(
        &self,
        depth: usize,
        x: &Array2<f64>,
        y: &Array1<f64>,
        splits: &[CvSplit],
    ) -> Result<CandidateScore, AnalysisError> {
        let params = self.base_params.clone().with_max_depth(depth);

        let mut fold_scores = Vec::with_capacity(splits.len());
        for split in splits {
            let train = Dataset::new(
                x.select(Axis(0), &split.train_indices),
                y.select(Axis(0), &split.train_indices),
            );
            let x_valid = x.select(Axis(0), &split.test_indices);
            let y_valid = y.select(Axis(0), &split.test_indices);

            let model = params.fit(&train)?;
            let predictions: Array1<f64> = model.predict(&x_valid);
            fold_scores.push(self.metric.score(&y_valid, &predictions)?);
        }

        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        debug!(depth, mean_score, "scored candidate");

        Ok(CandidateScore {
            max_depth: depth,
            mean_score,
            fold_scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Target depends on two thresholds, so depth 2 is enough and deeper
    /// trees only chase the alternating noise
    fn toy_data() -> (Array2<f64>, Array1<f64>) {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 7) as f64 });
        let y = Array1::from_shape_fn(n, |i| {
            let base = if i < 20 {
                10.0
            } else if i < 40 {
                20.0
            } else {
                30.0
            };
            base + if i % 2 == 0 { 0.5 } else { -0.5 }
        });
        (x, y)
    }

    #[test]
    fn test_grid_search_scores_every_candidate() {
        let (x, y) = toy_data();
        let result = GridSearch::new((1..=4).collect())
            .with_base_params(DecisionTreeParams::new().with_random_state(Some(0)))
            .with_cv(KFold::new(3).with_shuffle(true).with_random_state(Some(1)))
            .fit(&x, &y)
            .unwrap();

        assert_eq!(result.candidates.len(), 4);
        for (candidate, depth) in result.candidates.iter().zip(1..=4) {
            assert_eq!(candidate.max_depth, depth);
            assert_eq!(candidate.fold_scores.len(), 3);
            // negated MAE
            assert!(candidate.mean_score <= 0.0);
        }
        assert!(result.best_estimator.depth() <= result.best_depth);
        assert!((1..=4).contains(&result.best_depth));
    }

    #[test]
    fn test_grid_search_prefers_depth_that_explains_the_steps() {
        let (x, y) = toy_data();
        let result = GridSearch::new((1..=4).collect())
            .with_base_params(DecisionTreeParams::new().with_random_state(Some(0)))
            .with_cv(KFold::new(5).with_shuffle(true).with_random_state(Some(3)))
            .fit(&x, &y)
            .unwrap();

        let depth_one = &result.candidates[0];
        assert!(result.best_score > depth_one.mean_score);
        assert!(result.best_depth >= 2);
    }

    #[test]
    fn test_grid_search_is_reproducible_with_fixed_folds() {
        let (x, y) = toy_data();
        let search = GridSearch::new((1..=6).collect())
            .with_base_params(DecisionTreeParams::new().with_random_state(Some(7)))
            .with_cv(KFold::new(4).with_shuffle(true).with_random_state(Some(11)));

        let first = search.fit(&x, &y).unwrap();
        let second = search.clone().with_parallel(false).fit(&x, &y).unwrap();

        assert_eq!(first.best_depth, second.best_depth);
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.best_estimator, second.best_estimator);
    }

    #[test]
    fn test_grid_search_ties_keep_first_candidate() {
        // constant target: every depth scores 0
        let x = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
        let y = Array1::from_elem(12, 4.0);
        let result = GridSearch::new(vec![3, 1, 2]).fit(&x, &y).unwrap();

        assert_eq!(result.best_depth, 3);
        assert_eq!(result.best_score, 0.0);
    }

    #[test]
    fn test_grid_search_invalid() {
        let (x, y) = toy_data();
        assert!(GridSearch::new(vec![]).fit(&x, &y).is_err());
        assert!(GridSearch::new(vec![0, 1]).fit(&x, &y).is_err());
        assert!(GridSearch::new(vec![1]).with_cv(KFold::new(100)).fit(&x, &y).is_err());
    }
}
