//! Run the quarterly dengue forecasting pipeline
//!
//! Usage: cargo run --bin dengue-forecast -- --forecast-year 2026 --train-max-year 2025 --exclude-year 2024

use anyhow::{Context, Result};
use clap::Parser;
use dengue_forecast::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Forecast quarterly dengue cases")]
struct Args {
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Year to forecast
    #[arg(long)]
    forecast_year: Option<i32>,

    /// Last year used to refit the forecast model
    #[arg(long)]
    train_max_year: Option<i32>,

    /// Year never used as training rows (repeatable)
    #[arg(long = "exclude-year")]
    exclude_years: Vec<i32>,

    /// Year held out for evaluation (repeatable)
    #[arg(long = "test-year")]
    test_years: Vec<i32>,

    /// Output root for plots, forecasts and metrics
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Open each chart after writing it
    #[arg(long)]
    show_plots: bool,

    /// Forecast with this model instead of the best evaluated one
    #[arg(short, long)]
    model: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(year) = self.forecast_year {
            config.forecast_year = year;
        }
        if let Some(year) = self.train_max_year {
            config.train_max_year = year;
        }
        if !self.exclude_years.is_empty() {
            config.exclude_years = self.exclude_years;
        }
        if !self.test_years.is_empty() {
            config.test_years = self.test_years;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if self.show_plots {
            config.show_plots = true;
        }
        if self.model.is_some() {
            config.model = self.model;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dengue_forecast={}", level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.into_config()?;
    info!(
        "Forecasting {} (train <= {}, excluding {:?})",
        config.forecast_year, config.train_max_year, config.exclude_years
    );

    let report = Pipeline::new(config)
        .run()
        .context("Forecasting pipeline failed")?;

    println!("\nForecast ({}):\n{}", report.model, report.forecast);
    println!("Forecast written to {}", report.forecast_path.display());
    println!("Evaluation written to {}", report.evaluation_path.display());
    for plot in &report.plots {
        println!("Plot: {}", plot.display());
    }
    Ok(())
}
