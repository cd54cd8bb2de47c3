//! CART regression tree with a squared-error split criterion
//!
//! The tree plugs into linfa's training traits: `DecisionTreeParams`
//! implements `Fit` and the fitted `DecisionTreeRegressor` implements
//! `PredictInplace`, so the usual `params.fit(&dataset)?` and
//! `model.predict(&x)` calls work.

use linfa::traits::{Fit, PredictInplace};
use linfa::DatasetBase;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::feature::{validate_sample, validate_training_data};
use crate::utils::AnalysisError;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node predicting the mean target of its samples
    Leaf { value: f64, n_samples: usize },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        /// Mean squared deviation of the node's targets
        impurity: f64,
    },
}

impl TreeNode {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Number of training samples that reached this node
    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }
}

/// Hyperparameters of a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeParams {
    /// Maximum depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Seed of the feature permutation used to break equal-gain ties
    pub random_state: Option<u64>,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
        }
    }
}

impl DecisionTreeParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set (or clear) the random state
    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Check the hyperparameters are usable
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.max_depth == Some(0) {
            return Err(AnalysisError::ValidationError(
                "max_depth must be >= 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(AnalysisError::ValidationError(format!(
                "min_samples_split must be >= 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(AnalysisError::ValidationError(
                "min_samples_leaf must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fit a tree directly on a feature matrix and target vector
    pub fn fit_arrays(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<DecisionTreeRegressor, AnalysisError> {
        self.check()?;
        validate_training_data(x, y)?;

        let n_features = x.ncols();
        let rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut builder = TreeBuilder {
            x,
            y,
            params: self,
            rng,
            feature_order: (0..n_features).collect(),
            importances: vec![0.0; n_features],
        };
        let root = builder.build((0..x.nrows()).collect(), 0);

        // Normalize feature importances
        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        Ok(DecisionTreeRegressor {
            root,
            n_features,
            feature_importances: importances,
            params: self.clone(),
        })
    }
}

impl Fit<Array2<f64>, Array1<f64>, AnalysisError> for DecisionTreeParams {
    type Object = DecisionTreeRegressor;

    fn fit(
        &self,
        dataset: &DatasetBase<Array2<f64>, Array1<f64>>,
    ) -> Result<Self::Object, AnalysisError> {
        self.fit_arrays(&dataset.records, &dataset.targets)
    }
}

struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    child_sse: f64,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: &'a DecisionTreeParams,
    rng: ChaCha8Rng,
    feature_order: Vec<usize>,
    importances: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum, min, max) = indices.iter().map(|&i| self.y[i]).fold(
            (0.0, 0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(s, sq, lo, hi), v| (s + v, sq + v * v, lo.min(v), hi.max(v)),
        );
        let value = sum / n_samples as f64;
        let sse = (sq_sum - sum * sum / n_samples as f64).max(0.0);

        let should_stop = n_samples < self.params.min_samples_split
            || n_samples < 2 * self.params.min_samples_leaf
            || self.params.max_depth.map_or(false, |d| depth >= d)
            || min == max;

        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let Some(split) = self.find_best_split(&indices) else {
            return TreeNode::Leaf { value, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, split.feature_idx]] <= split.threshold);

        self.importances[split.feature_idx] += sse - split.child_sse;

        let left = Box::new(self.build(left_indices, depth + 1));
        let right = Box::new(self.build(right_indices, depth + 1));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity: sse / n_samples as f64,
        }
    }

    /// Sweep every boundary between distinct feature values and keep the
    /// split with the lowest summed child SSE
    fn find_best_split(&mut self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;

        // features are visited in random order; only a strictly better split
        // replaces the current best, so ties go to whichever came first
        self.feature_order.shuffle(&mut self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature_idx in &self.feature_order {
            sorted.clear();
            sorted.extend(indices.iter().map(|&i| (self.x[[i, feature_idx]], self.y[i])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            if sorted[0].0 == sorted[n - 1].0 {
                continue;
            }

            let (total_sum, total_sq) = sorted
                .iter()
                .fold((0.0, 0.0), |(s, sq), &(_, v)| (s + v, sq + v * v));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for pos in 1..n {
                let (x_prev, y_prev) = sorted[pos - 1];
                left_sum += y_prev;
                left_sq += y_prev * y_prev;

                let x_next = sorted[pos].0;
                if x_prev == x_next {
                    continue;
                }

                let n_left = pos;
                let n_right = n - pos;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let child_sse = (left_sq - left_sum * left_sum / n_left as f64)
                    + (right_sq - right_sum * right_sum / n_right as f64);

                if best.as_ref().map_or(true, |b| child_sse < b.child_sse) {
                    let mut threshold = (x_prev + x_next) / 2.0;
                    if threshold >= x_next {
                        threshold = x_prev;
                    }
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold,
                        child_sse,
                    });
                }
            }
        }

        best
    }
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    root: TreeNode,
    n_features: usize,
    feature_importances: Vec<f64>,
    params: DecisionTreeParams,
}

impl DecisionTreeRegressor {
    /// Parameters the tree was fitted with
    pub fn params(&self) -> &DecisionTreeParams {
        &self.params
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Number of features seen during fit
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Depth of the deepest leaf (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    /// Impurity decrease per feature, normalized to sum to one
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Predict the target of a single feature row
    pub fn predict_sample(&self, sample: &[f64]) -> Result<f64, AnalysisError> {
        validate_sample(sample, self.n_features)?;
        Ok(self.root.predict(ArrayView1::from(sample)))
    }
}

impl<D: Data<Elem = f64>> PredictInplace<ArrayBase<D, Ix2>, Array1<f64>> for DecisionTreeRegressor {
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<f64>) {
        for (row, target) in x.rows().into_iter().zip(y.iter_mut()) {
            *target = self.root.predict(row);
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<f64> {
        Array1::zeros(x.nrows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linfa::traits::Predict;
    use linfa::Dataset;
    use ndarray::{arr1, arr2};

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]]);
        let y = arr1(&[1.0, 1.0, 1.0, 10.0, 10.0, 10.0]);
        (x, y)
    }

    fn wavy_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i * (j + 3)) % 17) as f64 + j as f64 * 0.5);
        let y = Array1::from_shape_fn(n, |i| (i as f64 * 0.7).sin() * 10.0 + (i % 5) as f64);
        (x, y)
    }

    #[test]
    fn test_fit_step_function() {
        let (x, y) = step_data();
        let model = DecisionTreeParams::new()
            .with_max_depth(1)
            .with_random_state(Some(0))
            .fit_arrays(&x, &y)
            .unwrap();

        assert_eq!(model.depth(), 1);
        assert_eq!(model.n_leaves(), 2);
        match model.root() {
            TreeNode::Split { feature_idx, threshold, .. } => {
                assert_eq!(*feature_idx, 0);
                assert_eq!(*threshold, 2.5);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
        assert_eq!(model.predict_sample(&[0.5]).unwrap(), 1.0);
        assert_eq!(model.predict_sample(&[4.5]).unwrap(), 10.0);
    }

    #[test]
    fn test_fit_through_linfa_traits() {
        let (x, y) = step_data();
        let dataset = Dataset::new(x, y);
        let model = DecisionTreeParams::new()
            .with_random_state(Some(1))
            .fit(&dataset)
            .unwrap();

        let predictions: Array1<f64> = model.predict(&dataset.records);
        assert_eq!(predictions, dataset.targets);
    }

    #[test]
    fn test_max_depth_respected() {
        let (x, y) = wavy_data(120);
        for depth in 1..=6 {
            let model = DecisionTreeParams::new()
                .with_max_depth(depth)
                .with_random_state(Some(3))
                .fit_arrays(&x, &y)
                .unwrap();
            assert!(model.depth() <= depth);
            assert!(model.n_leaves() <= 1 << depth);
        }
    }

    #[test]
    fn test_unbounded_tree_memorizes_distinct_rows() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| (i * 3 + j) as f64);
        let y = Array1::from_shape_fn(40, |i| ((i * 7) % 11) as f64);
        let model = DecisionTreeParams::new()
            .with_random_state(Some(5))
            .fit_arrays(&x, &y)
            .unwrap();

        let predictions: Array1<f64> = model.predict(&x);
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_deeper_tree_fits_training_data_better() {
        let (x, y) = wavy_data(200);
        let sse = |depth: usize| {
            let model = DecisionTreeParams::new()
                .with_max_depth(depth)
                .with_random_state(Some(11))
                .fit_arrays(&x, &y)
                .unwrap();
            let predictions: Array1<f64> = model.predict(&x);
            (&predictions - &y).mapv(|r| r * r).sum()
        };
        assert!(sse(4) <= sse(1));
        assert!(sse(8) <= sse(4));
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = arr2(&[[1.0], [2.0], [3.0]]);
        let y = arr1(&[2.5, 2.5, 2.5]);
        let model = DecisionTreeParams::new().fit_arrays(&x, &y).unwrap();

        assert_eq!(model.depth(), 0);
        assert_eq!(model.predict_sample(&[100.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_single_sample_is_leaf() {
        let x = arr2(&[[1.0, 2.0]]);
        let y = arr1(&[7.0]);
        let model = DecisionTreeParams::new().with_max_depth(3).fit_arrays(&x, &y).unwrap();

        assert_eq!(model.n_leaves(), 1);
        assert_eq!(model.root().n_samples(), 1);
        assert_eq!(model.predict_sample(&[0.0, 0.0]).unwrap(), 7.0);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (x, y) = wavy_data(60);
        let model = DecisionTreeParams::new()
            .with_min_samples_leaf(7)
            .with_random_state(Some(2))
            .fit_arrays(&x, &y)
            .unwrap();

        fn min_leaf(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { n_samples, .. } => *n_samples,
                TreeNode::Split { left, right, .. } => min_leaf(left).min(min_leaf(right)),
            }
        }
        assert!(min_leaf(model.root()) >= 7);
    }

    #[test]
    fn test_same_seed_same_tree() {
        let (x, y) = wavy_data(80);
        let params = DecisionTreeParams::new().with_max_depth(5).with_random_state(Some(42));

        let a = params.fit_arrays(&x, &y).unwrap();
        let b = params.fit_arrays(&x, &y).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.predict_sample(&[3.0, 4.0, 5.0]).unwrap(),
            b.predict_sample(&[3.0, 4.0, 5.0]).unwrap()
        );
    }

    #[test]
    fn test_feature_importances() {
        // second column is noise, first column determines the target
        let x = arr2(&[[0.0, 5.0], [1.0, 3.0], [2.0, 5.0], [3.0, 3.0]]);
        let y = arr1(&[0.0, 0.0, 8.0, 8.0]);
        let model = DecisionTreeParams::new().with_random_state(Some(0)).fit_arrays(&x, &y).unwrap();

        let importances = model.feature_importances();
        assert_eq!(importances.len(), 2);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-10);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let (x, y) = step_data();

        assert!(DecisionTreeParams::new().with_max_depth(0).fit_arrays(&x, &y).is_err());
        assert!(DecisionTreeParams::new().with_min_samples_split(1).fit_arrays(&x, &y).is_err());
        assert!(DecisionTreeParams::new().fit_arrays(&x, &arr1(&[1.0])).is_err());
        assert!(DecisionTreeParams::new()
            .fit_arrays(&Array2::zeros((0, 1)), &Array1::zeros(0))
            .is_err());

        let model = DecisionTreeParams::new().fit_arrays(&x, &y).unwrap();
        assert!(model.predict_sample(&[1.0, 2.0]).is_err());
    }
}
