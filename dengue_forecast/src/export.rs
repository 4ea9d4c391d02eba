//! Flat-file outputs: forecast CSV and evaluation JSON

use crate::error::Result;
use crate::frame::{self, PREDICTED, YEAR_QUARTER};
use crate::trainer::ModelEvaluation;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// One evaluation entry as written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub model: String,
    pub year: i32,
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub smape: f64,
    pub r2: f64,
}

impl From<&ModelEvaluation> for EvaluationRecord {
    fn from(eval: &ModelEvaluation) -> Self {
        Self {
            model: eval.name.clone(),
            year: eval.year,
            mae: eval.metrics.mae,
            rmse: eval.metrics.rmse,
            mape: eval.metrics.mape,
            smape: eval.metrics.smape,
            r2: eval.metrics.r2,
        }
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write `year_quarter,predicted_casos_est` rows
pub fn write_forecast_csv<P: AsRef<Path>>(path: P, forecast: &DataFrame) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;

    let ids = frame::str_column(forecast, YEAR_QUARTER)?;
    let values = frame::f64_column(forecast, PREDICTED)?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([YEAR_QUARTER, PREDICTED])?;
    for (id, value) in ids.iter().zip(values.iter()) {
        writer.write_record([
            id.clone().unwrap_or_default(),
            value.map(|v| format!("{:.2}", v)).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;

    info!("Wrote forecast to {}", path.display());
    Ok(())
}

/// Write a JSON array of per-model, per-year metrics
pub fn write_evaluation_json<P: AsRef<Path>>(path: P, evaluations: &[ModelEvaluation]) -> Result<()> {
    let path = path.as_ref();
    create_parent(path)?;

    let records: Vec<EvaluationRecord> = evaluations.iter().map(EvaluationRecord::from).collect();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &records)?;

    info!("Wrote {} evaluation records to {}", records.len(), path.display());
    Ok(())
}
