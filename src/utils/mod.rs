/// Utility modules for error handling and argument validation
pub mod error;
pub mod validation;

// Re-export commonly used types
pub use error::AnalysisError;
pub use validation::{validate_at_least, validate_depths, validate_test_size};
