//! Data quality checks shared by the loader, feature engineering and forecasting

use crate::error::{ForecastError, Result};
use crate::frame::{self, PREDICTED, YEAR_QUARTER};
use crate::quarter::YearQuarter;
use polars::prelude::DataFrame;

/// Names from `required` that are not columns of `df`, sorted
pub fn missing_columns(df: &DataFrame, required: &[&str]) -> Vec<String> {
    let mut missing: Vec<String> = required
        .iter()
        .filter(|name| !frame::has_column(df, name))
        .map(|name| name.to_string())
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

/// Fail with the precise missing column names when `df` lacks any of `required`
pub fn check_required_columns(df: &DataFrame, required: &[&str], label: &str) -> Result<()> {
    let missing = missing_columns(df, required);
    if !missing.is_empty() {
        return Err(ForecastError::DataQuality(format!(
            "[{}] Missing columns: [{}]",
            label,
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Every engineered feature must exist and hold at least one value
pub fn check_feature_columns(df: &DataFrame, feature_cols: &[String]) -> Result<()> {
    if feature_cols.is_empty() {
        return Err(ForecastError::DataQuality(
            "No feature columns returned".to_string(),
        ));
    }

    let missing: Vec<&str> = feature_cols
        .iter()
        .filter(|c| !frame::has_column(df, c))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(ForecastError::DataQuality(format!(
            "Missing engineered features: [{}]",
            missing.join(", ")
        )));
    }

    let mut all_null = Vec::new();
    for col in feature_cols {
        if frame::is_all_null(df, col)? {
            all_null.push(col.as_str());
        }
    }
    if !all_null.is_empty() {
        return Err(ForecastError::DataQuality(format!(
            "All-null feature columns: [{}]",
            all_null.join(", ")
        )));
    }

    Ok(())
}

/// A forecast for `year` has exactly one row per quarter of that year
pub fn check_forecast_shape(df: &DataFrame, year: i32) -> Result<()> {
    let missing = missing_columns(df, &[YEAR_QUARTER, PREDICTED]);
    if !missing.is_empty() {
        return Err(ForecastError::ForecastingError(format!(
            "Forecast is missing columns: [{}]",
            missing.join(", ")
        )));
    }

    if df.height() != 4 {
        return Err(ForecastError::ForecastingError(format!(
            "Forecast should have 4 quarters for {}, got {} rows",
            year,
            df.height()
        )));
    }

    let quarters = frame::quarter_column(df)?;
    let expected = YearQuarter::quarters_of(year);
    if quarters != expected {
        let found: Vec<String> = quarters.iter().map(ToString::to_string).collect();
        return Err(ForecastError::ForecastingError(format!(
            "Forecast quarters [{}] do not cover {} Q1-Q4",
            found.join(", "),
            year
        )));
    }

    Ok(())
}
