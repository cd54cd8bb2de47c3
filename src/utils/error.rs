use std::fmt;

/// Custom error type for analysis operations
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// Validation errors (e.g., invalid test size, empty dataset, shape mismatch)
    ValidationError(String),
    /// Dataset errors (CSV parsing, missing target column, unreadable file)
    DatasetError(String),
    /// Model training/prediction errors
    ModelError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::ValidationError(msg) => write!(f, "ValidationError: {}", msg),
            AnalysisError::DatasetError(msg) => write!(f, "DatasetError: {}", msg),
            AnalysisError::ModelError(msg) => write!(f, "ModelError: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

// linfa's `Fit` requires the error type to absorb its own errors
impl From<linfa::Error> for AnalysisError {
    fn from(err: linfa::Error) -> Self {
        AnalysisError::ModelError(err.to_string())
    }
}
