use super::error::AnalysisError;

/// Validate a split fraction lies strictly inside (0, 1)
///
/// # Arguments
/// * `test_size` - Fraction of rows assigned to the test partition
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if out of range
pub fn validate_test_size(test_size: f64) -> Result<(), AnalysisError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(AnalysisError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    Ok(())
}

/// Validate a list of candidate tree depths
///
/// Depths must be non-empty and strictly positive.
pub fn validate_depths(name: &str, depths: &[usize]) -> Result<(), AnalysisError> {
    if depths.is_empty() {
        return Err(AnalysisError::ValidationError(format!(
            "{} must contain at least one depth",
            name
        )));
    }
    if depths.contains(&0) {
        return Err(AnalysisError::ValidationError(format!(
            "{} must only contain depths >= 1",
            name
        )));
    }
    Ok(())
}

/// Validate that a count-like setting is at least `min`
pub fn validate_at_least(name: &str, value: usize, min: usize) -> Result<(), AnalysisError> {
    if value < min {
        return Err(AnalysisError::ValidationError(format!(
            "{} must be >= {}, got {}",
            name, min, value
        )));
    }
    Ok(())
}
