//! Housing Insight Engine - decision-tree analysis of house prices
//!
//! This library loads a housing table, reports descriptive statistics,
//! charts learning and complexity curves for regression trees, tunes the
//! tree depth by cross-validated grid search and prices a sample house
//! against a nearest-neighbor baseline.

pub mod config;
pub mod dataset;
pub mod engine;
pub mod insight_core;
pub mod report;
pub mod stats;
pub mod utils;

pub use config::PipelineConfig;
pub use dataset::{HousingData, TrainTestSplit, SAMPLE_HOUSE};
pub use engine::{AggregateResult, HousingEngine, NeighborBaseline, PipelineReport, RunResult, TunedPrediction};
pub use stats::Statistics;
pub use utils::AnalysisError;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
