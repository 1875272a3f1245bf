//! altfactor CLI
//!
//! Loads configuration and records, preprocesses them with the configured
//! data processor, trains one registered model and prints a JSON report.

use altfactor::application::engine::FactorEngine;
use altfactor::config::load_properties;
use altfactor::infrastructure::records::{load_csv, synthetic_records};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Factor model engine", long_about = None)]
struct Args {
    /// TOML configuration file (processor.* and model.* keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV records (date,target,f1..fn). Synthetic records are used when omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of synthetic records to generate when no input is given
    #[arg(long, default_value_t = 1000)]
    synthetic: usize,

    /// Seed for synthetic records
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Registered model to train
    #[arg(short, long, default_value = "ensemble")]
    model: String,

    /// Training epochs
    #[arg(short, long, default_value_t = 50)]
    epochs: usize,

    /// Cancel preprocessing if it runs longer than this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let args = Args::parse();
    info!("Starting altfactor {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("Application failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let props = load_properties(args.config.as_deref()).context("Failed to load configuration")?;
    let engine = FactorEngine::from_properties(&props).context("Failed to initialize engine")?;

    let records = match &args.input {
        Some(path) => load_csv(path)?,
        None => {
            let feature_count = engine.config().model.feature_count;
            info!(
                "No input given, generating {} synthetic records with {} features",
                args.synthetic, feature_count
            );
            synthetic_records(args.synthetic, feature_count, args.seed, Utc::now().date_naive())
        }
    };

    let processed = match args.timeout_secs {
        Some(secs) => {
            engine
                .preprocess_with_timeout(records, Duration::from_secs(secs))
                .await?
        }
        None => engine.preprocess(&records)?,
    };
    info!(
        "Preprocessed {} records with the {} processor",
        processed.len(),
        engine.processor().name()
    );

    let report = engine
        .train_preprocessed(&args.model, &processed, args.epochs)
        .with_context(|| format!("Training '{}' failed", args.model))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
