//! K-fold cross-validation splits

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::utils::{validate_at_least, AnalysisError};

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-Fold splitter
///
/// Without shuffling, fold `i` is a contiguous block of rows; the first
/// `n_samples % n_splits` folds hold one extra row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Shuffle rows before cutting folds
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CvSplit>, AnalysisError> {
        validate_at_least("n_splits", self.n_splits, 2)?;
        if n_samples < self.n_splits {
            return Err(AnalysisError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();

        if self.shuffle {
            let mut rng = match self.random_state {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;

        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_k_fold_sizes() {
        let splits = KFold::new(3).split(10).unwrap();

        assert_eq!(splits.len(), 3);
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 10);
        }
    }

    #[test]
    fn test_k_fold_unshuffled_is_contiguous() {
        let splits = KFold::new(2).split(4).unwrap();
        assert_eq!(splits[0].test_indices, vec![0, 1]);
        assert_eq!(splits[0].train_indices, vec![2, 3]);
        assert_eq!(splits[1].test_indices, vec![2, 3]);
    }

    #[test]
    fn test_k_fold_test_sets_cover_all_rows_once() {
        let splits = KFold::new(5)
            .with_shuffle(true)
            .with_random_state(Some(42))
            .split(23)
            .unwrap();

        let mut seen = HashSet::new();
        for split in &splits {
            let train: HashSet<usize> = split.train_indices.iter().copied().collect();
            for idx in &split.test_indices {
                assert!(!train.contains(idx));
                assert!(seen.insert(*idx));
            }
        }
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn test_k_fold_seeded_shuffle_is_reproducible() {
        let kfold = KFold::new(4).with_shuffle(true).with_random_state(Some(9));
        assert_eq!(kfold.split(20).unwrap(), kfold.split(20).unwrap());
    }

    #[test]
    fn test_k_fold_invalid() {
        assert!(KFold::new(1).split(10).is_err());
        assert!(KFold::new(5).split(4).is_err());
    }
}
