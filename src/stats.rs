use std::collections::BTreeMap;

use crate::dataset::HousingData;

/// Descriptive statistics of a dataset's target column
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub field: String,
    /// Number of feature cells (records x features)
    pub count: usize,
    pub n_records: usize,
    pub n_features: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std: f64,
    pub q25: f64,
    pub q75: f64,
    pub iqr: f64,
    pub outlier_count: usize,
}

impl Statistics {
    /// Compute statistics for the target column of a dataset
    pub fn compute(dataset: &HousingData, field: &str) -> Option<Self> {
        let values = dataset.target.to_vec();
        let mut stats = Self::from_values(field, &values)?;
        stats.count = dataset.size();
        stats.n_features = dataset.n_features();
        Some(stats)
    }

    /// Compute statistics over a plain sequence of values
    pub fn from_values(field: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = values.len();
        let mean = mean(values)?;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        let q25 = percentile(&sorted, 25.0);
        let q75 = percentile(&sorted, 75.0);

        let mut stats = Statistics {
            field: field.to_string(),
            count: n,
            n_records: n,
            n_features: 1,
            min: sorted[0],
            max: sorted[n - 1],
            mean,
            median: percentile(&sorted, 50.0),
            std: variance.sqrt(),
            q25,
            q75,
            iqr: q75 - q25,
            outlier_count: 0,
        };

        let (lower, upper) = (stats.lower_fence(), stats.upper_fence());
        stats.outlier_count = values.iter().filter(|&&v| v < lower || v > upper).count();
        Some(stats)
    }

    /// Lower bound of the 1.5 x IQR fence
    pub fn lower_fence(&self) -> f64 {
        self.q25 - 1.5 * self.iqr
    }

    /// Upper bound of the 1.5 x IQR fence
    pub fn upper_fence(&self) -> f64 {
        self.q75 + 1.5 * self.iqr
    }
}

/// Percentile of already-sorted values, interpolating linearly between ranks
///
/// `q` is in [0, 100]. Returns NaN for empty input.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Most frequent value; the smallest one wins a tie
pub fn mode(values: &[usize]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0) += 1;
    }

    // ascending keys, so a strict comparison keeps the smaller value on ties
    let mut best: Option<(usize, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_statistics_from_values() {
        let stats = Statistics::from_values("value", &[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 30.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 50.0);
        assert_eq!(stats.q25, 20.0);
        assert_eq!(stats.q75, 40.0);
        assert_eq!(stats.iqr, 20.0);
        assert!((stats.std - 200.0f64.sqrt()).abs() < 1e-10);
        assert_eq!(stats.outlier_count, 0);
    }

    #[test]
    fn test_statistics_outliers() {
        // q25 = 2.0, q75 = 4.25, iqr = 2.25 -> fences at -1.375 and 7.625
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 2.0, 3.0, 100.0];
        let stats = Statistics::from_values("value", &values).unwrap();

        assert!((stats.q25 - 2.0).abs() < 1e-10);
        assert!((stats.q75 - 4.25).abs() < 1e-10);
        assert_eq!(stats.outlier_count, 1);
        assert!(stats.upper_fence() < 100.0);
        assert!(stats.lower_fence() < stats.min);
    }

    #[test]
    fn test_statistics_ordering() {
        let values = [7.5, 3.2, 9.9, 3.2, 1.1, 42.0, 5.5];
        let stats = Statistics::from_values("value", &values).unwrap();

        assert!(stats.min <= stats.median && stats.median <= stats.max);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        assert!(stats.q25 <= stats.median && stats.median <= stats.q75);
    }

    #[test]
    fn test_statistics_dataset_count() {
        let dataset = HousingData::new(
            "tiny",
            vec!["a".to_string(), "b".to_string()],
            arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]),
            arr1(&[5.0, 50.0, 20.0]),
        )
        .unwrap();
        let stats = Statistics::compute(&dataset, "price").unwrap();

        assert_eq!(stats.count, 6);
        assert_eq!(stats.n_records, 3);
        assert_eq!(stats.n_features, 2);
        assert_eq!(stats.field, "price");
        assert_eq!(stats.median, 20.0);
    }

    #[test]
    fn test_statistics_empty() {
        assert!(Statistics::from_values("value", &[]).is_none());
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 4.0);
        assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-10);
        assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-10);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(&[5, 4, 5, 4, 6]), Some(4));
        assert_eq!(mode(&[6, 6, 6, 1]), Some(6));
        assert_eq!(mode(&[]), None);
    }

    #[test]
    fn test_mode_handles_huge_values() {
        assert_eq!(mode(&[usize::MAX, 3, usize::MAX]), Some(usize::MAX));
        assert_eq!(mode(&[usize::MAX, 3]), Some(3));
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }
}
