/// ML algorithm core modules
pub mod cross_validation;
pub mod curves;
pub mod feature;
pub mod grid_search;
pub mod knn_kdtree;
pub mod metrics;
pub mod tree;

// Re-export commonly used types and functions
pub use cross_validation::{CvSplit, KFold};
pub use curves::{learning_curve, model_complexity, training_sizes, ErrorCurve};
pub use grid_search::{CandidateScore, GridSearch, GridSearchResult};
pub use knn_kdtree::{neighbor_average, Neighbor, NeighborIndex};
pub use metrics::PerformanceMetric;
pub use tree::{DecisionTreeParams, DecisionTreeRegressor, TreeNode};
