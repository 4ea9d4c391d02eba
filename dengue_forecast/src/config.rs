//! Pipeline configuration

use crate::data::DataPaths;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for a full pipeline run.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input file locations
    pub data: DataPaths,
    /// Root for plots, forecasts and metrics
    pub output_dir: PathBuf,
    /// Years held out one at a time for model evaluation
    pub test_years: Vec<i32>,
    /// Years never used as training rows
    pub exclude_years: Vec<i32>,
    pub forecast_year: i32,
    /// Last year whose rows may be used for the final refit
    pub train_max_year: i32,
    /// Years of history drawn before each evaluation year
    pub hist_years: i32,
    /// First year of history on the forecast chart (all history if unset)
    pub hist_start_year: Option<i32>,
    pub top_n_features: usize,
    /// Open each chart in the system viewer after writing it
    pub show_plots: bool,
    /// Quarters with fewer distinct weeks are dropped
    pub min_weeks_per_quarter: usize,
    /// Forecast with this model instead of the best evaluated one
    pub model: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataPaths::default(),
            output_dir: PathBuf::from("outputs"),
            test_years: vec![2024],
            exclude_years: vec![2024],
            forecast_year: 2026,
            train_max_year: 2025,
            hist_years: 2,
            hist_start_year: None,
            top_n_features: 10,
            show_plots: false,
            min_weeks_per_quarter: 10,
            model: None,
        }
    }
}

impl PipelineConfig {
    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the year settings and counts are consistent
    pub fn validate(&self) -> Result<()> {
        if self.forecast_year <= self.train_max_year {
            return Err(ForecastError::InvalidParameter(format!(
                "forecast_year ({}) must be after train_max_year ({})",
                self.forecast_year, self.train_max_year
            )));
        }
        if self.hist_years < 0 {
            return Err(ForecastError::InvalidParameter(
                "hist_years cannot be negative".to_string(),
            ));
        }
        if self.top_n_features == 0 {
            return Err(ForecastError::InvalidParameter(
                "top_n_features must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.output_dir.join("plots")
    }

    pub fn forecast_path(&self, model_name: &str) -> PathBuf {
        self.output_dir
            .join("forecasts")
            .join(format!("forecast_{}_{}.csv", self.forecast_year, model_name))
    }

    pub fn evaluation_path(&self) -> PathBuf {
        self.output_dir.join("metrics").join("evaluation.json")
    }
}
