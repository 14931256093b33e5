//! CLI entry point for the alley-width imputation pipeline.

use alley_impute::{AlleyWidthImputer, ImputationOutcome, ImputerConfig};
use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Impute missing alley/laneway widths in a property-valuation CSV",
    long_about = "Trains a gradient-boosted regression model on records where the\n\
                  minimum alley/laneway width is known (optionally merged with an\n\
                  external reference table) and fills the gaps in the dataset.\n\n\
                  EXAMPLES:\n  \
                  # Internal data only\n  \
                  alley-impute -i listings.csv -o listings_filled.csv\n\n  \
                  # With an external reference table and a JSON report\n  \
                  alley-impute -i listings.csv -r reference.csv -o filled.csv --report report.json"
)]
struct Args {
    /// Path to the dataset CSV
    #[arg(short, long)]
    input: PathBuf,

    /// Path to the external reference-table CSV (optional)
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// Path for the filled output CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Optional path for a JSON diagnostics report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Minimum clean training rows required to attempt imputation
    #[arg(long, default_value_t = 50)]
    min_training_rows: usize,

    /// Held-out evaluation fraction
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let dataset = read_csv(&args.input)
        .with_context(|| format!("Failed to read dataset from {}", args.input.display()))?;
    info!(
        "Loaded dataset: {} rows, {} columns",
        dataset.height(),
        dataset.width()
    );

    // A missing reference file is a recoverable condition: warn and
    // degrade to internal-only training.
    let reference = match &args.reference {
        Some(path) => match read_csv(path) {
            Ok(df) => {
                info!("Loaded reference table: {} rows", df.height());
                Some(df)
            }
            Err(e) => {
                warn!(
                    "Reference table unavailable ({}); continuing with internal data only",
                    e
                );
                None
            }
        },
        None => None,
    };

    let config = ImputerConfig::builder()
        .min_training_rows(args.min_training_rows)
        .test_fraction(args.test_fraction)
        .seed(args.seed)
        .build()?;

    let outcome = AlleyWidthImputer::new(config).impute(dataset, reference)?;

    match &outcome {
        ImputationOutcome::Filled { report, .. } => {
            info!(
                "Imputation complete: {} gaps filled ({} clean training rows)",
                report.imputed_rows, report.clean_training_rows
            );
            if let Some(metrics) = &report.metrics {
                info!(
                    "Held-out metrics: MAE={:.4} RMSE={:.4} R2={:.4}",
                    metrics.mae, metrics.rmse, metrics.r2
                );
            }
            if let Some(path) = &args.report {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(file, report)?;
                info!("Report written to {}", path.display());
            }
        }
        ImputationOutcome::Unchanged { reason, .. } => {
            warn!("Dataset returned unchanged: {:?}", reason);
        }
    }

    let mut data = outcome.into_data();
    write_csv(&mut data, &args.output)
        .with_context(|| format!("Failed to write output to {}", args.output.display()))?;
    info!("Output written to {}", args.output.display());

    Ok(())
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
