//! End-to-end run: load, evaluate, select, forecast, plot and export

use crate::config::PipelineConfig;
use crate::data::DataLoader;
use crate::error::{ForecastError, Result};
use crate::export::{write_evaluation_json, write_forecast_csv};
use crate::features::FeatureEngineer;
use crate::forecaster::Forecaster;
use crate::trainer::{best_model, ModelEvaluation, ModelTrainer};
use crate::visualizer::Visualizer;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything a pipeline run produced
#[derive(Debug)]
pub struct PipelineReport {
    /// Model used for the forecast
    pub model: String,
    pub evaluations: Vec<ModelEvaluation>,
    pub forecast: DataFrame,
    /// Top features of the forecast model
    pub importance: Option<DataFrame>,
    pub plots: Vec<PathBuf>,
    pub forecast_path: PathBuf,
    pub evaluation_path: PathBuf,
}

/// Runs the forecasting workflow for one configuration
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    engineer: FeatureEngineer,
    trainer: ModelTrainer,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            engineer: FeatureEngineer::new(),
            trainer: ModelTrainer::new(),
        }
    }

    /// Use a custom set of candidate models
    pub fn with_trainer(mut self, trainer: ModelTrainer) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn with_engineer(mut self, engineer: FeatureEngineer) -> Self {
        self.engineer = engineer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<PipelineReport> {
        let config = &self.config;
        config.validate()?;

        let loader = DataLoader::with_paths(config.data.clone())
            .with_min_weeks(config.min_weeks_per_quarter);
        let df = loader.load_and_prepare_data()?;

        let (df_feat, feature_cols) = self.engineer.create_features(&df)?;
        self.engineer.validate_features(&df_feat, &feature_cols)?;
        info!("{} features over {} quarters", feature_cols.len(), df_feat.height());

        let visualizer = Visualizer::new((12.0, 5.0), config.show_plots)
            .with_output_dir(config.plots_dir());
        let mut plots = Vec::new();

        let mut evaluations = Vec::new();
        for &year in &config.test_years {
            let year_evals =
                self.trainer
                    .evaluate_year(&df_feat, &feature_cols, year, &config.exclude_years)?;
            for eval in &year_evals {
                info!("{} ({}):\n{}", eval.name, year, eval.metrics);
                plots.push(visualizer.plot_actual_vs_predicted(
                    &eval.test_frame,
                    &eval.predictions,
                    &eval.name,
                    year,
                    Some(&df),
                    config.hist_years,
                )?);
            }
            evaluations.extend(year_evals);
        }

        let model_name = self.select_model(&evaluations)?;
        let base_model = self.trainer.get(&model_name).ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "Unknown model '{}', expected one of {:?}",
                model_name,
                self.trainer.model_names()
            ))
        })?;
        info!("Forecasting {} with {}", config.forecast_year, model_name);

        let forecaster =
            Forecaster::new(self.engineer.clone()).with_log_target(self.trainer.log_target());
        let run = forecaster.refit_and_forecast(
            &df_feat,
            &feature_cols,
            base_model,
            config.forecast_year,
            config.train_max_year,
            &config.exclude_years,
        )?;

        let importance = run
            .importance
            .as_ref()
            .map(|df| df.head(Some(config.top_n_features)));
        if let Some(top) = &importance {
            let title = format!("Top {} Feature Importance", config.top_n_features);
            Visualizer::print_feature_importance(top, &title)?;
            plots.push(visualizer.plot_feature_importance(top, &format!("{} ({})", title, model_name))?);
        }

        plots.push(visualizer.plot_forecast(
            &run.forecast,
            &df,
            config.forecast_year,
            &model_name,
            config.hist_start_year,
        )?);

        let forecast_path = config.forecast_path(&model_name);
        write_forecast_csv(&forecast_path, &run.forecast)?;
        let evaluation_path = config.evaluation_path();
        write_evaluation_json(&evaluation_path, &evaluations)?;

        Ok(PipelineReport {
            model: model_name,
            evaluations,
            forecast: run.forecast,
            importance,
            plots,
            forecast_path,
            evaluation_path,
        })
    }

    fn select_model(&self, evaluations: &[ModelEvaluation]) -> Result<String> {
        if let Some(name) = &self.config.model {
            return Ok(name.clone());
        }
        if let Some(name) = best_model(evaluations) {
            return Ok(name);
        }
        let first = self.trainer.model_names().into_iter().next().ok_or_else(|| {
            ForecastError::InvalidParameter("No models registered".to_string())
        })?;
        warn!("No evaluations to select from, using {}", first);
        Ok(first)
    }
}
