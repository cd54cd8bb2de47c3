use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::dataset::{HousingData, TrainTestSplit};
use crate::insight_core::feature::{validate_features, validate_sample};
use crate::insight_core::{
    learning_curve, model_complexity, neighbor_average, CandidateScore, DecisionTreeParams,
    ErrorCurve, GridSearch, GridSearchResult, KFold, NeighborIndex,
};
use crate::stats::{mean, mode, Statistics};
use crate::utils::AnalysisError;

/// The housing analysis pipeline over one dataset
///
/// All randomness (the train/test shuffle and the tree tie-breaking) is
/// drawn from one generator, seeded from the configuration when a seed is
/// given and from OS entropy otherwise.
#[derive(Debug)]
pub struct HousingEngine {
    data: HousingData,
    config: PipelineConfig,
    rng: ChaCha8Rng,
}

impl HousingEngine {
    /// Create an engine, validating the configuration against the data
    pub fn new(data: HousingData, config: PipelineConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        validate_features(&data.features)?;
        validate_sample(&config.sample, data.n_features())?;

        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self { data, config, rng })
    }

    pub fn data(&self) -> &HousingData {
        &self.data
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Descriptive statistics of the target column
    pub fn explore(&self) -> crate::Result<Statistics> {
        let stats = Statistics::compute(&self.data, &self.data.target_name).ok_or_else(|| {
            AnalysisError::DatasetError(format!("dataset '{}' has no records", self.data.name))
        })?;
        info!(records = stats.n_records, features = stats.n_features, "explored dataset");
        Ok(stats)
    }

    /// Shuffle and partition the rows by the configured test size
    pub fn split(&mut self) -> Result<TrainTestSplit, AnalysisError> {
        let split = self.data.train_test_split(self.config.test_size, &mut self.rng)?;
        info!(train = split.n_train(), test = split.n_test(), "split dataset");
        Ok(split)
    }

    /// One learning curve per configured depth
    pub fn learning_curves(&mut self, split: &TrainTestSplit) -> Result<Vec<ErrorCurve>, AnalysisError> {
        let depths = self.config.learning_curve_depths.clone();
        let mut curves = Vec::with_capacity(depths.len());

        for depth in depths {
            let params = self.tree_params();
            let curve = learning_curve(
                depth,
                split,
                self.config.metric,
                self.config.learning_curve_points,
                &params,
            )?;
            info!(depth, "learning curve ready");
            curves.push(curve);
        }

        Ok(curves)
    }

    /// Training and test error across the configured complexity depths
    pub fn model_complexity(&mut self, split: &TrainTestSplit) -> Result<ErrorCurve, AnalysisError> {
        let params = self.tree_params();
        let curve = model_complexity(&self.config.complexity_depths, split, self.config.metric, &params)?;
        info!(depths = curve.len(), "model complexity curve ready");
        Ok(curve)
    }

    /// Tune on every row with the final fold count and price the sample house
    pub fn fit_predict(&mut self) -> Result<TunedPrediction, AnalysisError> {
        let search = self.tune(self.config.final_cv_folds)?;
        let prediction = search.best_estimator.predict_sample(&self.config.sample)?;
        info!(best_depth = search.best_depth, prediction, "final model tuned");
        Ok(TunedPrediction { search, prediction })
    }

    /// One repeated run: tune with the repeat fold count and price the sample house
    pub fn rinse_and_repeat(&mut self) -> Result<RunResult, AnalysisError> {
        let search = self.tune(self.config.repeat_cv_folds)?;
        let prediction = search.best_estimator.predict_sample(&self.config.sample)?;
        debug!(best_depth = search.best_depth, prediction, "repeat finished");
        Ok(RunResult {
            prediction,
            best_depth: search.best_depth,
        })
    }

    /// Repeat tuning and prediction, collecting the chosen depths and prices
    pub fn aggregate(&mut self) -> Result<AggregateResult, AnalysisError> {
        let mut predictions = Vec::with_capacity(self.config.repeats);
        let mut best_depths = Vec::with_capacity(self.config.repeats);

        for run in 0..self.config.repeats {
            let result = self.rinse_and_repeat()?;
            debug!(run, "collected repeat");
            predictions.push(result.prediction);
            best_depths.push(result.best_depth);
        }

        let aggregate = AggregateResult::from_runs(predictions, best_depths)?;
        info!(
            repeats = aggregate.len(),
            depth_mode = aggregate.depth_mode,
            mean_prediction = aggregate.mean_prediction,
            "aggregated repeats"
        );
        Ok(aggregate)
    }

    /// Average price of the rows closest to the sample house
    pub fn nearest_neighbor_baseline(&self) -> Result<NeighborBaseline, AnalysisError> {
        let index = NeighborIndex::build(&self.data.features)?;
        let neighbors = index.nearest(&self.config.sample, self.config.n_neighbors)?;

        let average = neighbor_average(&self.data.target, &neighbors)?;

        let indices: Vec<usize> = neighbors.iter().map(|n| n.index).collect();
        let prices: Vec<f64> = indices.iter().map(|&i| self.data.target[i]).collect();

        info!(k = indices.len(), average, "nearest neighbor baseline");
        Ok(NeighborBaseline {
            indices,
            prices,
            average,
        })
    }

    /// Run every stage in order
    pub fn run(&mut self) -> crate::Result<PipelineReport> {
        let statistics = self.explore()?;
        let split = self.split()?;
        let learning_curves = self.learning_curves(&split)?;
        let complexity = self.model_complexity(&split)?;
        let tuned = self.fit_predict()?;
        let aggregate = self.aggregate()?;
        let baseline = self.nearest_neighbor_baseline()?;

        Ok(PipelineReport {
            statistics,
            n_train: split.n_train(),
            n_test: split.n_test(),
            learning_curves,
            complexity,
            tuned,
            aggregate,
            baseline,
        })
    }

    fn tune(&mut self, folds: usize) -> Result<GridSearchResult, AnalysisError> {
        let params = self.tree_params();
        GridSearch::new(self.config.grid_depths.clone())
            .with_cv(KFold::new(folds))
            .with_metric(self.config.metric)
            .with_base_params(params)
            .with_parallel(self.config.parallel)
            .fit(&self.data.features, &self.data.target)
    }

    /// Tree parameters with a seed drawn from the engine generator, or none
    /// when the engine itself is unseeded
    fn tree_params(&mut self) -> DecisionTreeParams {
        let random_state = match self.config.seed {
            Some(_) => Some(self.rng.gen::<u64>()),
            None => None,
        };
        DecisionTreeParams::new().with_random_state(random_state)
    }
}

/// The tuned model and its price for the sample house
#[derive(Debug, Clone)]
pub struct TunedPrediction {
    pub search: GridSearchResult,
    pub prediction: f64,
}

impl TunedPrediction {
    pub fn best_depth(&self) -> usize {
        self.search.best_depth
    }

    pub fn best_score(&self) -> f64 {
        self.search.best_score
    }

    pub fn candidates(&self) -> &[CandidateScore] {
        &self.search.candidates
    }
}

/// Outcome of one repeated run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    pub prediction: f64,
    pub best_depth: usize,
}

/// Predictions and chosen depths over all repeated runs
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub predictions: Vec<f64>,
    pub best_depths: Vec<usize>,
    /// Most frequent depth; the smallest wins ties
    pub depth_mode: usize,
    pub mean_prediction: f64,
}

impl AggregateResult {
    /// Summarise equal-length, non-empty run outputs
    pub fn from_runs(predictions: Vec<f64>, best_depths: Vec<usize>) -> Result<Self, AnalysisError> {
        if predictions.len() != best_depths.len() {
            return Err(AnalysisError::ValidationError(format!(
                "{} predictions but {} depths",
                predictions.len(),
                best_depths.len()
            )));
        }

        let empty = || AnalysisError::ValidationError("no runs to aggregate".to_string());
        let depth_mode = mode(&best_depths).ok_or_else(empty)?;
        let mean_prediction = mean(&predictions).ok_or_else(empty)?;

        Ok(Self {
            predictions,
            best_depths,
            depth_mode,
            mean_prediction,
        })
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// Nearest rows to the sample house and their mean price
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborBaseline {
    pub indices: Vec<usize>,
    pub prices: Vec<f64>,
    pub average: f64,
}

/// Everything the full pipeline produces
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub statistics: Statistics,
    pub n_train: usize,
    pub n_test: usize,
    pub learning_curves: Vec<ErrorCurve>,
    pub complexity: ErrorCurve,
    pub tuned: TunedPrediction,
    pub aggregate: AggregateResult,
    pub baseline: NeighborBaseline,
}
