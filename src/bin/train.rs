//! Cross-validate tree-ensemble candidates and evaluate the best one
//!
//! Usage: cargo run --release --bin train -- --impute median --scale --scoring f1-macro

use anyhow::Result;
use clap::Parser;
use stampede_risk::config::{Config, DEFAULT_CONFIG_PATH};
use stampede_risk::data::Dataset;
use stampede_risk::ml::Scoring;
use stampede_risk::pipeline::run_training;
use stampede_risk::preprocess::ImputeStrategy;
use stampede_risk::report::{render_training, write_json};
use stampede_risk::RiskError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train and select a stampede risk classifier")]
struct Args {
    /// CSV file with CCTV records (default: cctv_data.csv, or the config value)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Optional TOML configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Missing-value strategy for numeric columns (mean, median)
    #[arg(long)]
    impute: Option<ImputeStrategy>,

    /// Standardise numeric columns
    #[arg(long)]
    scale: bool,

    /// Cross-validation metric (accuracy, f1-macro)
    #[arg(long)]
    scoring: Option<Scoring>,

    /// Number of cross-validation folds
    #[arg(short, long)]
    folds: Option<usize>,

    /// Seed for the split and fold assignment
    #[arg(short, long)]
    seed: Option<u64>,

    /// Also write the report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stampede_risk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<RiskError>() {
                Some(RiskError::MissingDataFile { path }) => {
                    eprintln!("ERROR: {} not found!", path.display());
                    eprintln!("Run `generate_data` first, or pass --data <path>.");
                }
                _ => eprintln!("ERROR: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::load_or_default(&args.config)?;
    let data_path = args.data.unwrap_or(config.data.path);

    let load = Dataset::load_csv(&data_path, config.data.on_malformed)?;
    if !load.rejected.is_empty() {
        warn!("{} malformed rows skipped", load.rejected.len());
    }

    let mut training = config.training;
    if let Some(impute) = args.impute {
        training.preprocess.impute = impute;
    }
    if args.scale {
        training.preprocess.scale = true;
    }
    if let Some(scoring) = args.scoring {
        training.scoring = scoring;
    }
    if let Some(folds) = args.folds {
        training.folds = folds;
    }
    if let Some(seed) = args.seed {
        training.seed = seed;
    }

    let candidates: Vec<&str> = training.candidates.iter().map(|c| c.name.as_str()).collect();
    info!("Candidates: {}", candidates.join(", "));

    let start_time = Instant::now();
    let (report, _pipeline) = run_training(&load.dataset, &training)?;
    info!("Training completed in {:.2}s", start_time.elapsed().as_secs_f64());

    print!("{}", render_training(&report));

    if let Some(path) = args.report_json {
        write_json(&report, &path)?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
