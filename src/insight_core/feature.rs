use ndarray::{Array1, Array2};

use crate::utils::AnalysisError;

/// Validate feature matrix dimensions and values
///
/// # Arguments
/// * `features` - Feature matrix to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if invalid
pub fn validate_features(features: &Array2<f64>) -> Result<(), AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix cannot be empty".to_string(),
        ));
    }

    if features.ncols() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix must have at least one column".to_string(),
        ));
    }

    // Check for NaN or Inf values
    if features.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ValidationError(
            "feature matrix contains NaN or Inf values".to_string(),
        ));
    }

    Ok(())
}

/// Validate a feature matrix together with its target vector
pub fn validate_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<(), AnalysisError> {
    validate_features(x)?;

    if x.nrows() != y.len() {
        return Err(AnalysisError::ValidationError(format!(
            "x rows ({}) must match y length ({})",
            x.nrows(),
            y.len()
        )));
    }

    if y.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ValidationError(
            "target vector contains NaN or Inf values".to_string(),
        ));
    }

    Ok(())
}

/// Validate a single query row against the expected feature count
pub fn validate_sample(sample: &[f64], n_features: usize) -> Result<(), AnalysisError> {
    if sample.len() != n_features {
        return Err(AnalysisError::ValidationError(format!(
            "sample has {} features, expected {}",
            sample.len(),
            n_features
        )));
    }

    if sample.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ValidationError(
            "sample contains NaN or Inf values".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_validate_features_valid() {
        let features = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        assert!(validate_features(&features).is_ok());
    }

    #[test]
    fn test_validate_features_empty_rows() {
        let features = Array2::<f64>::zeros((0, 2));
        assert!(validate_features(&features).is_err());
    }

    #[test]
    fn test_validate_features_empty_cols() {
        let features = Array2::<f64>::zeros((2, 0));
        assert!(validate_features(&features).is_err());
    }

    #[test]
    fn test_validate_features_with_nan() {
        let features = arr2(&[[1.0, f64::NAN], [3.0, 4.0]]);
        let result = validate_features(&features);
        assert!(result.unwrap_err().to_string().contains("NaN"));
    }

    #[test]
    fn test_validate_features_with_inf() {
        let features = arr2(&[[1.0, f64::INFINITY], [3.0, 4.0]]);
        let result = validate_features(&features);
        assert!(result.unwrap_err().to_string().contains("Inf"));
    }

    #[test]
    fn test_validate_training_data_mismatch() {
        let x = arr2(&[[1.0], [2.0]]);
        let y = arr1(&[1.0, 2.0, 3.0]);
        assert!(validate_training_data(&x, &y).is_err());
        assert!(validate_training_data(&x, &arr1(&[1.0, 2.0])).is_ok());
    }

    #[test]
    fn test_validate_sample() {
        assert!(validate_sample(&[1.0, 2.0], 2).is_ok());

        let err = validate_sample(&[1.0, 2.0, 3.0], 2).unwrap_err();
        assert_eq!(err.to_string(), "ValidationError: sample has 3 features, expected 2");

        assert!(validate_sample(&[1.0, f64::NAN], 2).is_err());
    }
}
