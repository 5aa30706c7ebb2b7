//! Generate synthetic CCTV crowd data
//!
//! Usage: cargo run --bin generate_data -- --rows 100 --output cctv_data.csv

use anyhow::{Context, Result};
use clap::Parser;
use stampede_risk::config::{Config, DEFAULT_CONFIG_PATH, DEFAULT_DATA_PATH};
use stampede_risk::data::DataGenerator;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate synthetic CCTV crowd data")]
struct Args {
    /// Output CSV file
    #[arg(short, long, default_value = DEFAULT_DATA_PATH)]
    output: PathBuf,

    /// Number of records (default: 100, or the config value)
    #[arg(short, long)]
    rows: Option<usize>,

    /// Random seed for reproducible output
    #[arg(short, long)]
    seed: Option<u64>,

    /// Optional TOML configuration with generator ranges
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
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
            eprintln!("ERROR: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::load_or_default(&args.config)?;

    let mut generator_config = config.generator;
    if let Some(rows) = args.rows {
        generator_config.rows = rows;
    }
    if args.seed.is_some() {
        generator_config.seed = args.seed;
    }

    info!(
        "Generating {} records (seed: {:?})",
        generator_config.rows, generator_config.seed
    );
    let dataset = DataGenerator::new(generator_config)?.generate();

    dataset
        .save_csv(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Generated {} records -> {}", dataset.len(), args.output.display());
    for (level, count) in dataset.label_distribution() {
        println!("  {}: {}", level, count);
    }

    Ok(())
}
