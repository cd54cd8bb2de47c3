//! KD-Tree based nearest-neighbor lookup for the price baseline
//!
//! Rows are indexed once; each query returns the k closest rows by
//! Euclidean distance over the raw (unscaled) features.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use ndarray::{Array1, Array2};
use tracing::debug;

use super::feature::{validate_features, validate_sample};
use crate::utils::AnalysisError;

/// Widest row the KD-Tree holds; wider data is scanned exactly
pub const MAX_FEATURES: usize = 16;

/// Points per leaf bucket. kiddo cannot split a bucket whose points all share
/// one value on the split axis, so an axis may hold at most this many ties.
const BUCKET_SIZE: usize = 512;

type NeighborTree = KdTree<f64, u64, MAX_FEATURES, BUCKET_SIZE, u32>;

/// A row returned by a neighbor query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Row index in the indexed feature matrix
    pub index: usize,
    /// Euclidean distance to the query
    pub distance: f64,
}

enum Backend {
    Tree(Box<NeighborTree>),
    /// Brute-force search over the copied rows
    Scan(Array2<f64>),
}

/// Nearest-neighbor index over the rows of a feature matrix
///
/// Rows go into a KD-Tree when they fit one. Data wider than
/// `MAX_FEATURES`, or with more than `BUCKET_SIZE` equal values on any axis
/// (zero padding included), is searched by an exact scan instead.
pub struct NeighborIndex {
    backend: Backend,
    n_samples: usize,
    n_features: usize,
}

impl NeighborIndex {
    /// Build the index
    ///
    /// # Arguments
    /// * `features` - Feature matrix (rows=samples, cols=features)
    ///
    /// # Complexity
    /// * Build: O(n log n)
    pub fn build(features: &Array2<f64>) -> Result<Self, AnalysisError> {
        validate_features(features)?;
        let (n_samples, n_features) = features.dim();

        let ties = max_tied_values(features);
        let backend = if n_features <= MAX_FEATURES && ties <= BUCKET_SIZE {
            let mut tree = NeighborTree::new();
            for (i, row) in features.rows().into_iter().enumerate() {
                tree.add(&pad(row.iter().copied()), i as u64);
            }
            Backend::Tree(Box::new(tree))
        } else {
            debug!(n_features, ties, "falling back to exact neighbor scan");
            Backend::Scan(features.clone())
        };

        debug!(n_samples, n_features, "built neighbor index");

        Ok(Self {
            backend,
            n_samples,
            n_features,
        })
    }

    pub fn len(&self) -> usize {
        self.n_samples
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0
    }

    /// The `k` rows closest to `sample`, nearest first
    ///
    /// `k` larger than the number of indexed rows returns every row.
    pub fn nearest(&self, sample: &[f64], k: usize) -> Result<Vec<Neighbor>, AnalysisError> {
        validate_sample(sample, self.n_features)?;
        if k == 0 {
            return Err(AnalysisError::ValidationError(
                "k must be at least 1".to_string(),
            ));
        }

        let effective_k = k.min(self.n_samples);

        let neighbors = match &self.backend {
            Backend::Tree(tree) => tree
                .nearest_n::<SquaredEuclidean>(&pad(sample.iter().copied()), effective_k)
                .into_iter()
                .map(|n| Neighbor {
                    index: n.item as usize,
                    distance: n.distance.sqrt(),
                })
                .collect(),
            Backend::Scan(features) => {
                let mut scored: Vec<(f64, usize)> = features
                    .rows()
                    .into_iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let d: f64 = row
                            .iter()
                            .zip(sample)
                            .map(|(a, b)| (a - b) * (a - b))
                            .sum();
                        (d, i)
                    })
                    .collect();
                scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                scored.truncate(effective_k);
                scored
                    .into_iter()
                    .map(|(d, index)| Neighbor {
                        index,
                        distance: d.sqrt(),
                    })
                    .collect()
            }
        };

        Ok(neighbors)
    }
}

/// Copy a row into a fixed-width point; unused axes stay zero and add no distance
fn pad(values: impl Iterator<Item = f64>) -> [f64; MAX_FEATURES] {
    let mut point = [0.0; MAX_FEATURES];
    for (slot, value) in point.iter_mut().zip(values) {
        *slot = value;
    }
    point
}

/// Longest run of equal values on any tree axis
///
/// Padding axes are all zero, so they tie every row.
fn max_tied_values(features: &Array2<f64>) -> usize {
    let padded = if features.ncols() < MAX_FEATURES {
        features.nrows()
    } else {
        0
    };

    features
        .columns()
        .into_iter()
        .map(|column| {
            let mut sorted = column.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let mut longest = 0;
            let mut run = 0;
            for i in 0..sorted.len() {
                run = if i > 0 && sorted[i] == sorted[i - 1] { run + 1 } else { 1 };
                longest = longest.max(run);
            }
            longest
        })
        .fold(padded, usize::max)
}

/// Mean target of the given neighbors
pub fn neighbor_average(target: &Array1<f64>, neighbors: &[Neighbor]) -> Result<f64, AnalysisError> {
    if neighbors.is_empty() {
        return Err(AnalysisError::ModelError(
            "nearest neighbor query returned no rows".to_string(),
        ));
    }

    let mut total = 0.0;
    for neighbor in neighbors {
        total += target.get(neighbor.index).ok_or_else(|| {
            AnalysisError::ValidationError(format!(
                "neighbor row {} is outside a target of length {}",
                neighbor.index,
                target.len()
            ))
        })?;
    }
    Ok(total / neighbors.len() as f64)
}
