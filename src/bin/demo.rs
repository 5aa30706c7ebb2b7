//! Rule-based stampede risk demo
//!
//! Usage: cargo run --bin demo -- --data cctv_data.csv --samples 5

use anyhow::Result;
use clap::Parser;
use stampede_risk::config::{Config, DEFAULT_CONFIG_PATH};
use stampede_risk::data::Dataset;
use stampede_risk::pipeline::run_demo;
use stampede_risk::report::{render_demo, write_json};
use stampede_risk::{RiskError, RiskScorer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate the rule-based stampede risk scorer")]
struct Args {
    /// CSV file with CCTV records (default: cctv_data.csv, or the config value)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Optional TOML configuration
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Number of sample predictions to show
    #[arg(long)]
    samples: Option<usize>,

    /// Seed for the train/test shuffle (random when omitted)
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

    let mut demo_config = config.demo;
    if let Some(samples) = args.samples {
        demo_config.sample_size = samples;
    }
    if args.seed.is_some() {
        demo_config.seed = args.seed;
    }

    let scorer = RiskScorer::new(config.scorer);
    let report = run_demo(&load.dataset, &scorer, &demo_config)?;

    print!("{}", render_demo(&report));
    if load.skipped_empty > 0 || !load.rejected.is_empty() {
        println!(
            "Rows dropped at load: {} empty, {} malformed",
            load.skipped_empty,
            load.rejected.len()
        );
    }

    if let Some(path) = args.report_json {
        write_json(&report, &path)?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
