//! Feature engineering for quarterly case forecasting
//!
//! Turns the quarter frame into model inputs: target lags, rolling
//! statistics over past quarters, calendar encodings and climate index lags.
//! The current quarter's target is never used as an input.

use crate::data::CLIMATE_COLUMNS;
use crate::data_quality::{check_feature_columns, check_required_columns};
use crate::error::{ForecastError, Result};
use crate::frame::{self, QUARTER, TARGET, YEAR, YEAR_QUARTER};
use crate::quarter::YearQuarter;
use epi_math::{lag, log1p, pct_change, quarter_cos, quarter_one_hot, quarter_sin};
use epi_math::{rolling_mean, rolling_std};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Columns every input frame must carry
pub const BASE_COLUMNS: [&str; 4] = [YEAR_QUARTER, YEAR, QUARTER, TARGET];

/// Smallest divisor for `casos_growth_1`, so growth after a zero-case quarter
/// is the plain difference
const GROWTH_MIN_BASE: f64 = 1.0;

/// Feature engineering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Target lags in quarters
    pub case_lags: Vec<usize>,
    /// Rolling windows (in quarters) over past targets
    pub rolling_windows: Vec<usize>,
    /// Climate columns to carry as predictors when present
    pub climate_columns: Vec<String>,
    /// Lags applied to each climate column
    pub climate_lags: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            case_lags: vec![1, 2, 3, 4],
            rolling_windows: vec![2, 4],
            climate_columns: CLIMATE_COLUMNS.iter().map(|(_, c)| c.to_string()).collect(),
            climate_lags: vec![1, 2],
        }
    }
}

/// Feature engineer that creates model features from the quarter frame
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    /// Create a new feature engineer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new feature engineer with custom configuration
    pub fn with_config(config: FeatureConfig) -> Result<Self> {
        if config.case_lags.iter().chain(&config.rolling_windows).any(|&n| n == 0) {
            return Err(ForecastError::InvalidParameter(
                "Lags and rolling windows must be greater than zero".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Climate columns from the configuration that exist in `df`
    pub fn climate_columns_in(&self, df: &DataFrame) -> Vec<String> {
        self.config
            .climate_columns
            .iter()
            .filter(|c| frame::has_column(df, c))
            .cloned()
            .collect()
    }

    /// Append engineered feature columns to the base columns of `df`.
    ///
    /// Rows are sorted by quarter first. Returns the augmented frame and the
    /// feature names in column order.
    pub fn create_features(&self, df: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
        check_required_columns(df, &BASE_COLUMNS, "features")?;

        let climate_cols = self.climate_columns_in(df);
        let mut keep: Vec<&str> = BASE_COLUMNS.to_vec();
        keep.extend(climate_cols.iter().map(String::as_str));

        let base = sorted_by_quarter(&frame::select_columns(df, &keep)?)?;
        let grid = QuarterGrid::new(&frame::quarter_column(&base)?);
        let quarters = frame::i32_column(&base, QUARTER)?;
        let target = grid.spread(&frame::f64_column(&base, TARGET)?);

        let mut features: Vec<Series> = Vec::new();
        let lag_1 = lag(&target, 1);

        for &k in &self.config.case_lags {
            features.push(Series::new(
                &format!("casos_lag_{}", k),
                grid.gather(&lag(&target, k)),
            ));
        }

        for &w in &self.config.rolling_windows {
            features.push(Series::new(
                &format!("casos_roll_mean_{}", w),
                grid.gather(&rolling_mean(&lag_1, w)?),
            ));
            features.push(Series::new(
                &format!("casos_roll_std_{}", w),
                grid.gather(&rolling_std(&lag_1, w)?),
            ));
        }

        features.push(Series::new("casos_log_lag_1", grid.gather(&log1p(&lag_1))));
        features.push(Series::new(
            "casos_growth_1",
            grid.gather(&pct_change(&lag_1, &lag(&target, 2), GROWTH_MIN_BASE)),
        ));
        if self.config.case_lags.contains(&4) {
            features.push(Series::new(
                "casos_same_quarter_last_year",
                grid.gather(&lag(&target, 4)),
            ));
        }

        features.extend(calendar_features(&quarters)?);

        for col in &climate_cols {
            let values = frame::f64_column(&base, col)?;
            let on_grid = grid.spread(&values);
            features.push(Series::new(col.as_str(), values));
            for &k in &self.config.climate_lags {
                features.push(Series::new(
                    &format!("{}_lag_{}", col, k),
                    grid.gather(&lag(&on_grid, k)),
                ));
            }
        }

        let mut columns: Vec<Series> = BASE_COLUMNS
            .iter()
            .map(|name| base.column(name).cloned())
            .collect::<PolarsResult<_>>()?;
        let feature_cols: Vec<String> = features.iter().map(|s| s.name().to_string()).collect();
        columns.extend(features);

        let df_feat = DataFrame::new(columns)?;
        debug!(
            "Engineered {} features over {} quarters",
            feature_cols.len(),
            df_feat.height()
        );
        Ok((df_feat, feature_cols))
    }

    /// Engineered columns exist and are not entirely null
    pub fn validate_features(&self, df_feat: &DataFrame, feature_cols: &[String]) -> Result<()> {
        check_feature_columns(df_feat, feature_cols)
    }
}

/// Rows of a quarter-sorted frame placed on the contiguous range of quarters
/// they span. Shifts are taken on the grid, so a missing quarter yields nulls
/// rather than pulling in the row before it.
struct QuarterGrid {
    positions: Vec<usize>,
    len: usize,
}

impl QuarterGrid {
    /// `quarters` must be sorted and free of duplicates
    fn new(quarters: &[YearQuarter]) -> Self {
        let first = quarters.first().map_or(0, YearQuarter::ordinal);
        let positions: Vec<usize> = quarters
            .iter()
            .map(|q| (q.ordinal() - first) as usize)
            .collect();
        let len = positions.last().map_or(0, |p| p + 1);
        Self { positions, len }
    }

    fn spread(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut grid = vec![None; self.len];
        for (&pos, value) in self.positions.iter().zip(values) {
            grid[pos] = *value;
        }
        grid
    }

    fn gather(&self, grid: &[Option<f64>]) -> Vec<Option<f64>> {
        self.positions.iter().map(|&pos| grid[pos]).collect()
    }
}

fn calendar_features(quarters: &[Option<i32>]) -> Result<Vec<Series>> {
    let mut sin = Vec::with_capacity(quarters.len());
    let mut cos = Vec::with_capacity(quarters.len());
    let mut one_hot: [Vec<f64>; 4] = Default::default();

    for (row, q) in quarters.iter().enumerate() {
        let q = q
            .filter(|q| *q > 0)
            .ok_or_else(|| ForecastError::DataError(format!("Invalid quarter at row {}", row)))?
            as u32;
        sin.push(quarter_sin(q)?);
        cos.push(quarter_cos(q)?);
        for (column, value) in one_hot.iter_mut().zip(quarter_one_hot(q)?) {
            column.push(value);
        }
    }

    let mut series = vec![Series::new("quarter_sin", sin), Series::new("quarter_cos", cos)];
    for (i, column) in one_hot.into_iter().enumerate() {
        series.push(Series::new(&format!("is_q{}", i + 1), column));
    }
    Ok(series)
}

/// Sort a frame by its `year_quarter` column, rejecting duplicate quarters
pub fn sorted_by_quarter(df: &DataFrame) -> Result<DataFrame> {
    let quarters = frame::quarter_column(df)?;
    let mut order: Vec<usize> = (0..quarters.len()).collect();
    order.sort_by_key(|&i| quarters[i]);

    if let Some(pair) = order.windows(2).find(|w| quarters[w[0]] == quarters[w[1]]) {
        return Err(ForecastError::DataError(format!(
            "Duplicate quarter {} in frame",
            quarters[pair[0]]
        )));
    }

    if order.iter().enumerate().all(|(pos, &i)| pos == i) {
        return Ok(df.clone());
    }

    let idx = IdxCa::from_vec("idx", order.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarter_frame(n: usize) -> DataFrame {
        let mut ids = Vec::new();
        let mut years = Vec::new();
        let mut quarters = Vec::new();
        let mut cases = Vec::new();
        let mut nino = Vec::new();
        for i in 0..n {
            let year = 2020 + (i / 4) as i32;
            let q = (i % 4) as i32 + 1;
            ids.push(format!("{}Q{}", year, q));
            years.push(year);
            quarters.push(q);
            cases.push(100.0 * (i + 1) as f64);
            nino.push(Some(0.1 * i as f64));
        }
        DataFrame::new(vec![
            Series::new(YEAR_QUARTER, ids),
            Series::new(YEAR, years),
            Series::new(QUARTER, quarters),
            Series::new(TARGET, cases),
            Series::new("nino34", nino),
        ])
        .unwrap()
    }

    #[test]
    fn test_lags_never_see_current_target() {
        let engineer = FeatureEngineer::new();
        let (df_feat, cols) = engineer.create_features(&quarter_frame(8)).unwrap();

        let lag_1 = frame::f64_column(&df_feat, "casos_lag_1").unwrap();
        assert_eq!(lag_1[0], None);
        assert_eq!(lag_1[3], Some(300.0));

        // window of 2 over quarters t-1 and t-2
        let roll = frame::f64_column(&df_feat, "casos_roll_mean_2").unwrap();
        assert_eq!(roll[1], None);
        assert_eq!(roll[2], Some(150.0));

        assert!(cols.contains(&"nino34_lag_2".to_string()));
        assert!(!cols.contains(&"nino12".to_string()));
        assert!(!cols.contains(&TARGET.to_string()));
    }

    #[test]
    fn test_rows_are_sorted_and_stale_features_dropped() {
        let df = quarter_frame(6);
        let reversed = df.reverse();
        let engineer = FeatureEngineer::new();
        let (first, cols) = engineer.create_features(&reversed).unwrap();
        let (second, cols_again) = engineer.create_features(&first).unwrap();

        assert_eq!(cols, cols_again);
        assert_eq!(first.width(), second.width());
        assert_eq!(
            frame::str_column(&second, YEAR_QUARTER).unwrap()[0].as_deref(),
            Some("2020Q1")
        );
    }

    #[test]
    fn test_invalid_config() {
        let config = FeatureConfig {
            case_lags: vec![0],
            ..Default::default()
        };
        assert!(FeatureEngineer::with_config(config).is_err());
    }
}
