//! Refit on allowed history and forecast a full calendar year

use crate::data_quality::check_forecast_shape;
use crate::error::{ForecastError, Result};
use crate::features::FeatureEngineer;
use crate::frame::{self, quarter_key_columns, PREDICTED, TARGET, YEAR};
use crate::models::Regressor;
use crate::quarter::YearQuarter;
use crate::trainer::{decode_prediction, fit_model, importance_frame, training_matrix};
use ndarray::Array2;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Output of a refit-and-forecast run
#[derive(Debug)]
pub struct ForecastRun {
    /// One row per quarter of the forecast year
    pub forecast: DataFrame,
    /// The model fitted for this run
    pub model: Box<dyn Regressor>,
    /// Importance frame of `model`, all features, descending
    pub importance: Option<DataFrame>,
}

/// Quarter series being extended one step at a time
struct History {
    quarters: Vec<YearQuarter>,
    cases: Vec<Option<f64>>,
    climate: Vec<(String, Vec<Option<f64>>)>,
}

impl History {
    fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = quarter_key_columns(&self.quarters);
        columns.push(Series::new(TARGET, self.cases.clone()));
        for (name, values) in &self.climate {
            columns.push(Series::new(name.as_str(), values.clone()));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Append a quarter with unknown cases, taking climate from `known` when
    /// available and otherwise carrying the last value forward
    fn push(&mut self, quarter: YearQuarter, known: Option<&Vec<Option<f64>>>) {
        for (i, (_, values)) in self.climate.iter_mut().enumerate() {
            let observed = known.and_then(|row| row[i]);
            let carried = values.iter().rev().find_map(|v| *v);
            values.push(observed.or(carried));
        }
        self.quarters.push(quarter);
        self.cases.push(None);
    }
}

/// Produces year-ahead forecasts by recursive one-quarter-ahead prediction
#[derive(Debug, Clone)]
pub struct Forecaster {
    engineer: FeatureEngineer,
    log_target: bool,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(FeatureEngineer::new())
    }
}

impl Forecaster {
    pub fn new(engineer: FeatureEngineer) -> Self {
        Self {
            engineer,
            log_target: true,
        }
    }

    /// Train on `ln(1 + cases)` (the default) or on raw counts
    pub fn with_log_target(mut self, log_target: bool) -> Self {
        self.log_target = log_target;
        self
    }

    pub fn engineer(&self) -> &FeatureEngineer {
        &self.engineer
    }

    /// Refit a fresh copy of `base_model` and forecast the four quarters of
    /// `forecast_year`.
    ///
    /// Training rows are those with `year <= train_max_year` outside
    /// `exclude_years`. Excluded years still provide lag inputs. Quarters
    /// between the end of history and the forecast year are predicted too,
    /// each prediction feeding the lags of the next.
    pub fn refit_and_forecast(
        &self,
        df_feat: &DataFrame,
        feature_cols: &[String],
        base_model: &dyn Regressor,
        forecast_year: i32,
        train_max_year: i32,
        exclude_years: &[i32],
    ) -> Result<ForecastRun> {
        if forecast_year <= train_max_year {
            return Err(ForecastError::InvalidParameter(format!(
                "forecast_year ({}) must be after train_max_year ({})",
                forecast_year, train_max_year
            )));
        }

        let train = training_matrix(df_feat, feature_cols, |year| {
            year <= train_max_year && !exclude_years.contains(&year)
        })?;
        if train.rows.is_empty() {
            return Err(ForecastError::ForecastingError(format!(
                "No complete training rows up to {} outside {:?}",
                train_max_year, exclude_years
            )));
        }

        let model = fit_model(base_model, &train.x, &train.y, self.log_target)?;
        info!(
            "Refitted {} on {} rows (<= {}, excluding {:?})",
            model.name(),
            train.rows.len(),
            train_max_year,
            exclude_years
        );

        let mut history = self.history(df_feat, train_max_year)?;
        let known_climate = self.climate_by_quarter(df_feat)?;

        let last = history.quarters.last().copied().ok_or_else(|| {
            ForecastError::ForecastingError(format!("No history up to {}", train_max_year))
        })?;
        let end = YearQuarter::quarters_of(forecast_year)[3];

        let mut quarter = last.next();
        let mut predictions = Vec::new();
        while quarter <= end {
            history.push(quarter, known_climate.get(&quarter));
            let prediction = self.predict_last(&history, feature_cols, model.as_ref())?;
            debug!("{}: predicted {:.1} cases", quarter, prediction);

            if let Some(slot) = history.cases.last_mut() {
                *slot = Some(prediction);
            }
            if quarter.year() == forecast_year {
                predictions.push(prediction);
            }
            quarter = quarter.next();
        }

        let mut columns = quarter_key_columns(&YearQuarter::quarters_of(forecast_year));
        columns.push(Series::new(PREDICTED, predictions));
        let forecast = DataFrame::new(columns)?;
        check_forecast_shape(&forecast, forecast_year)?;

        let importance = match model.feature_importances() {
            Some(values) => Some(importance_frame(feature_cols, &values, feature_cols.len())?),
            None => None,
        };

        Ok(ForecastRun {
            forecast,
            model,
            importance,
        })
    }

    fn history(&self, df_feat: &DataFrame, train_max_year: i32) -> Result<History> {
        let years = frame::i32_column(df_feat, YEAR)?;
        let mask: Vec<bool> = years
            .iter()
            .map(|y| y.map_or(false, |y| y <= train_max_year))
            .collect();
        let past = crate::features::sorted_by_quarter(&frame::filter_rows(df_feat, &mask)?)?;

        let climate = self
            .engineer
            .climate_columns_in(&past)
            .into_iter()
            .map(|name| {
                let values = frame::f64_column(&past, &name)?;
                Ok((name, values))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(History {
            quarters: frame::quarter_column(&past)?,
            cases: frame::f64_column(&past, TARGET)?,
            climate,
        })
    }

    /// Climate values of every quarter in `df`, in `climate_columns_in` order
    fn climate_by_quarter(&self, df: &DataFrame) -> Result<HashMap<YearQuarter, Vec<Option<f64>>>> {
        let quarters = frame::quarter_column(df)?;
        let columns = self
            .engineer
            .climate_columns_in(df)
            .iter()
            .map(|name| frame::f64_column(df, name))
            .collect::<Result<Vec<_>>>()?;

        Ok(quarters
            .into_iter()
            .enumerate()
            .map(|(row, q)| (q, columns.iter().map(|col| col[row]).collect()))
            .collect())
    }

    fn predict_last(
        &self,
        history: &History,
        feature_cols: &[String],
        model: &dyn Regressor,
    ) -> Result<f64> {
        let (df_feat, _) = self.engineer.create_features(&history.to_frame()?)?;
        let row = df_feat.height().checked_sub(1).ok_or_else(|| {
            ForecastError::ForecastingError("Empty feature frame".to_string())
        })?;

        // a gap in history leaves nulls in the row; fall back to the
        // column's last observed value
        let mut values = Vec::with_capacity(feature_cols.len());
        for col in feature_cols {
            let column = frame::f64_column(&df_feat, col)?;
            let value = match column[row] {
                Some(value) => value,
                None => {
                    let carried = column[..row].iter().rev().find_map(|v| *v).ok_or_else(|| {
                        ForecastError::ForecastingError(format!(
                            "Feature '{}' is missing for {}",
                            col, history.quarters[row]
                        ))
                    })?;
                    debug!("{}: '{}' carried forward as {}", history.quarters[row], col, carried);
                    carried
                }
            };
            values.push(value);
        }

        let x = Array2::from_shape_vec((1, values.len()), values)
            .map_err(|e| ForecastError::ForecastingError(e.to_string()))?;
        let prediction = model.predict(&x)?;
        Ok(decode_prediction(prediction[0], self.log_target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RidgeRegression;

    fn quarter_frame(years: std::ops::RangeInclusive<i32>) -> DataFrame {
        let quarters: Vec<YearQuarter> = years.flat_map(YearQuarter::quarters_of).collect();
        let cases: Vec<f64> = quarters
            .iter()
            .map(|q| [800.0, 1200.0, 300.0, 150.0][q.quarter() as usize - 1] + q.year() as f64 - 2015.0)
            .collect();
        let nino: Vec<f64> = (0..quarters.len()).map(|i| (i as f64 * 0.7).sin()).collect();
        let mut columns = quarter_key_columns(&quarters);
        columns.push(Series::new(TARGET, cases));
        columns.push(Series::new("nino34", nino));
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_forecast_skips_gap_year() {
        let engineer = FeatureEngineer::new();
        let (df_feat, cols) = engineer.create_features(&quarter_frame(2015..=2024)).unwrap();
        let forecaster = Forecaster::new(engineer);
        let base = RidgeRegression::default();

        let run = forecaster
            .refit_and_forecast(&df_feat, &cols, &base, 2026, 2024, &[])
            .unwrap();

        assert_eq!(run.forecast.height(), 4);
        let ids = frame::str_column(&run.forecast, crate::frame::YEAR_QUARTER).unwrap();
        assert_eq!(ids[0].as_deref(), Some("2026Q1"));
        let values = frame::f64_column(&run.forecast, PREDICTED).unwrap();
        assert!(values.iter().all(|v| v.map_or(false, |v| v >= 0.0)));
        assert!(!base.is_fitted());
        assert!(run.model.is_fitted());
    }

    #[test]
    fn test_forecast_year_must_follow_training() {
        let engineer = FeatureEngineer::new();
        let (df_feat, cols) = engineer.create_features(&quarter_frame(2015..=2020)).unwrap();
        let forecaster = Forecaster::new(engineer);

        let result =
            forecaster.refit_and_forecast(&df_feat, &cols, &RidgeRegression::default(), 2020, 2020, &[]);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }
}
