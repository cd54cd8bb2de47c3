use clap::{Args, Parser, Subcommand};
use housing_insight_engine::insight_core::ErrorCurve;
use housing_insight_engine::report::{chart, export_curves};
use housing_insight_engine::{
    AggregateResult, HousingData, HousingEngine, NeighborBaseline, PipelineConfig, Statistics,
    TunedPrediction,
};
use std::path::PathBuf;

const CHART_WIDTH: usize = 60;
const CHART_HEIGHT: usize = 16;

#[derive(Parser)]
#[command(name = "housing-insight")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Decision tree analysis of house prices", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Options {
    /// CSV file to analyze instead of the embedded Boston table
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Target column of the CSV file
    #[arg(short, long, global = true, default_value = "MEDV")]
    target: String,

    /// JSON pipeline configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for a reproducible run
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Number of repeated tuning runs
    #[arg(short, long, global = true)]
    repeats: Option<usize>,

    /// Directory to write curve data as CSV
    #[arg(long, global = true)]
    curves_dir: Option<PathBuf>,

    /// Skip rendering curve charts
    #[arg(long, global = true)]
    no_charts: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print descriptive statistics of the prices
    Explore,

    /// Split the data and chart learning and complexity curves
    Curves,

    /// Tune the final model and price the sample house
    Tune,

    /// Run the full analysis (default)
    Run,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "housing_insight_engine=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let options = cli.options;

    let mut config = match &options.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if options.seed.is_some() {
        config.seed = options.seed;
    }
    if let Some(repeats) = options.repeats {
        config.repeats = repeats;
    }

    let data = match &options.data {
        Some(path) => HousingData::from_path(path, &options.target)?,
        None => HousingData::boston()?,
    };
    println!(
        "Loaded dataset '{}' with {} records and {} features",
        data.name,
        data.len(),
        data.n_features()
    );

    let mut engine = HousingEngine::new(data, config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Explore => {
            print_stats(&engine.explore()?);
        }

        Commands::Curves => {
            let split = engine.split()?;
            println!("\nTraining rows: {}  Test rows: {}", split.n_train(), split.n_test());
            let mut curves = engine.learning_curves(&split)?;
            curves.push(engine.model_complexity(&split)?);
            show_curves(&curves, &options)?;
        }

        Commands::Tune => {
            let tuned = engine.fit_predict()?;
            print_tuned(&tuned, &engine.config().sample);
        }

        Commands::Run => {
            let report = engine.run()?;
            print_stats(&report.statistics);
            println!("\nTraining rows: {}  Test rows: {}", report.n_train, report.n_test);

            let mut curves = report.learning_curves;
            curves.push(report.complexity);
            show_curves(&curves, &options)?;

            print_tuned(&report.tuned, &engine.config().sample);
            print_aggregate(&report.aggregate);
            print_baseline(&report.baseline);
        }
    }

    Ok(())
}

fn show_curves(curves: &[ErrorCurve], options: &Options) -> anyhow::Result<()> {
    if !options.no_charts {
        for curve in curves {
            println!("\n{}", chart::render(curve, CHART_WIDTH, CHART_HEIGHT)?);
        }
    }

    if let Some(dir) = &options.curves_dir {
        let written = export_curves(curves, dir)?;
        println!("\nWrote {} curve files to {}", written.len(), dir.display());
    }

    Ok(())
}

fn print_stats(stats: &Statistics) {
    println!("\n=== Statistics for '{}' ===", stats.field);
    println!("Data points:   {}", stats.count);
    println!("Features:      {}", stats.n_features);
    println!("Min price:     {:.2}", stats.min);
    println!("Max price:     {:.2}", stats.max);
    println!("Mean price:    {:.2}", stats.mean);
    println!("Median price:  {:.2}", stats.median);
    println!("Std deviation: {:.2}", stats.std);
    println!("IQR:           {:.2}", stats.iqr);
    println!("Outliers:      {}", stats.outlier_count);
}

fn print_tuned(tuned: &TunedPrediction, sample: &[f64]) {
    println!("\n=== Final Model ===");
    for candidate in tuned.candidates() {
        println!("  max_depth {:>2}: {:.4}", candidate.max_depth, candidate.mean_score);
    }
    println!("House:      {:?}", sample);
    println!("Prediction: {:.4}", tuned.prediction);
    println!("Best depth: {}", tuned.best_depth());
    println!("Best score: {:.4}", tuned.best_score());
}

fn print_aggregate(aggregate: &AggregateResult) {
    println!("\n=== Repeated Runs ({}) ===", aggregate.len());
    println!("Best depths:         {:?}", aggregate.best_depths);
    println!("Depth mode:          {}", aggregate.depth_mode);
    let predictions: Vec<String> = aggregate.predictions.iter().map(|p| format!("{:.2}", p)).collect();
    println!("Predictions:         [{}]", predictions.join(", "));
    println!("Predictions average: {:.4}", aggregate.mean_prediction);
}

fn print_baseline(baseline: &NeighborBaseline) {
    println!("\n=== Nearest Neighbors ({}) ===", baseline.indices.len());
    println!("Rows:    {:?}", baseline.indices);
    println!("Average: {:.4}", baseline.average);
}
