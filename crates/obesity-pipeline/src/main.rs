//! CLI entry point for training and querying the obesity pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use obesity_pipeline::{
    ArtifactFormat, FeatureConfig, ObesityPipeline, PredictionInput, TrainingConfig, read_csv,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Obesity risk-factor classifier",
    long_about = "Train a preprocessing + random forest pipeline on the obesity dataset \
                  and classify new records with it.\n\n\
                  EXAMPLES:\n  \
                  # Train on ./Obesity.csv, writing pipeline_obesidade.bin and .json\n  \
                  obesity-pipeline train\n\n  \
                  # Classify one partial record\n  \
                  obesity-pipeline predict --model pipeline_obesidade.bin \
                  --record '{\"Age\": 23, \"CAEC\": \"Sometimes\"}'"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a pipeline and write both artifact encodings
    Train(TrainArgs),
    /// Classify records with a persisted pipeline
    Predict(PredictArgs),
}

#[derive(ClapArgs, Debug)]
struct TrainArgs {
    /// Path to the training CSV
    #[arg(short, long, default_value = "Obesity.csv")]
    data: PathBuf,

    /// JSON feature configuration (defaults to the obesity dataset layout)
    #[arg(short, long)]
    features: Option<PathBuf>,

    /// Directory for the artifacts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Artifact file stem
    #[arg(long, default_value = "pipeline_obesidade")]
    name: String,

    /// Held-out fraction (0.0 - 1.0)
    #[arg(long, default_value = "0.3")]
    test_size: f64,

    /// Seed for the split and the forest
    #[arg(long, default_value = "4242")]
    seed: u64,

    /// Use a plain random split instead of a stratified one
    #[arg(long)]
    no_stratify: bool,

    /// Number of trees
    #[arg(long, default_value = "100")]
    n_estimators: usize,

    /// Maximum tree depth (unlimited if omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct PredictArgs {
    /// Artifact written by `train` (.json is read as portable, anything else as binary)
    #[arg(short, long)]
    model: PathBuf,

    /// A JSON object, or an array of objects
    #[arg(short, long, conflicts_with = "input", required_unless_present = "input")]
    record: Option<String>,

    /// CSV file with one record per row
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON feature configuration used when the artifact is a legacy one
    #[arg(short, long)]
    features: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.quiet);

    let result = match &cli.command {
        Command::Train(args) => run_train(args),
        Command::Predict(args) => run_predict(args),
    };
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn load_features(path: Option<&Path>) -> Result<FeatureConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read feature config {}", path.display()))?;
            let config = serde_json::from_str(&text)
                .with_context(|| format!("Invalid feature config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(FeatureConfig::obesity()),
    }
}

fn run_train(args: &TrainArgs) -> Result<()> {
    let config = load_features(args.features.as_deref())?;

    let mut builder = TrainingConfig::builder()
        .test_size(args.test_size)
        .random_seed(args.seed)
        .stratify(!args.no_stratify)
        .n_estimators(args.n_estimators);
    if let Some(depth) = args.max_depth {
        builder = builder.max_depth(depth);
    }
    let training = builder.build()?;

    info!("Loading dataset from: {}", args.data.display());
    let df = read_csv(&args.data)?;
    info!("Dataset loaded: {:?}", df.shape());

    let mut pipeline = ObesityPipeline::new(config).with_training_config(training);
    let outcome = pipeline.train(&df)?;

    // stdout carries the result; logs go to stderr
    if args.json {
        let summary = serde_json::json!({
            "accuracy": outcome.accuracy,
            "train_rows": outcome.train_rows,
            "test_rows": outcome.x_test.height(),
            "report": outcome.report,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Accuracy: {:.4}", outcome.accuracy);
        println!();
        println!("{}", outcome.report);
    }

    for format in [ArtifactFormat::Binary, ArtifactFormat::Portable] {
        let path = args.output_dir.join(format!("{}.{}", args.name, format.extension()));
        pipeline.persist_as(&path, format)?;
    }

    Ok(())
}

fn run_predict(args: &PredictArgs) -> Result<()> {
    let config = load_features(args.features.as_deref())?;
    let pipeline = ObesityPipeline::load(config, &args.model)?;

    let input = match (&args.record, &args.input) {
        (Some(record), _) => {
            let value: serde_json::Value =
                serde_json::from_str(record).context("--record is not valid JSON")?;
            PredictionInput::from_json(value)?
        }
        (None, Some(path)) => PredictionInput::Table(read_csv(path)?),
        (None, None) => return Err(anyhow!("either --record or --input is required")),
    };

    for label in pipeline.predict(input)? {
        println!("{}", label);
    }
    Ok(())
}
