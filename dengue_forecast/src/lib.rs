//! # Dengue Forecast
//!
//! Quarterly dengue case forecasting from weekly case counts and monthly
//! ocean climate indices.
//!
//! ## Features
//!
//! - Loading and quarterly alignment of case and sea-surface-temperature files
//! - Feature engineering: case lags, rolling statistics, seasonal encodings
//!   and climate index lags
//! - Tree ensembles and a ridge baseline behind one `Regressor` trait
//! - Held-out year evaluation and recursive year-ahead forecasting
//! - PNG charts and CSV/JSON exports
//!
//! ## Quick Start
//!
//! ```no_run
//! use dengue_forecast::{DataLoader, FeatureEngineer, Forecaster, ModelTrainer};
//!
//! let df = DataLoader::new().load_and_prepare_data()?;
//! let engineer = FeatureEngineer::new();
//! let (df_feat, feature_cols) = engineer.create_features(&df)?;
//!
//! let trainer = ModelTrainer::new();
//! let evaluations = trainer.evaluate_year(&df_feat, &feature_cols, 2024, &[2024])?;
//! for eval in &evaluations {
//!     println!("{}: MAE {:.1}", eval.name, eval.metrics.mae);
//! }
//!
//! let model = trainer.get("gradient_boosting").expect("registered");
//! let run = Forecaster::new(engineer)
//!     .refit_and_forecast(&df_feat, &feature_cols, model, 2026, 2025, &[2024])?;
//! println!("{}", run.forecast);
//! # Ok::<(), dengue_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod data_quality;
pub mod error;
pub mod export;
pub mod features;
pub mod forecaster;
pub mod frame;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod quarter;
pub mod trainer;
pub mod visualizer;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{DataLoader, DataPaths};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{FeatureConfig, FeatureEngineer};
pub use crate::forecaster::{ForecastRun, Forecaster};
pub use crate::metrics::{forecast_accuracy, ForecastAccuracy};
pub use crate::models::Regressor;
pub use crate::pipeline::{Pipeline, PipelineReport};
pub use crate::quarter::YearQuarter;
pub use crate::trainer::{ModelEvaluation, ModelTrainer};
pub use crate::visualizer::Visualizer;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
