//! Column access helpers over polars data frames

use crate::error::{ForecastError, Result};
use crate::quarter::YearQuarter;
use polars::prelude::*;

/// Quarter identifier column shared by every frame
pub const YEAR_QUARTER: &str = "year_quarter";
/// Calendar year column
pub const YEAR: &str = "year";
/// Quarter number column (1-4)
pub const QUARTER: &str = "quarter";
/// Observed quarterly case count
pub const TARGET: &str = "casos_est";
/// Forecast value column
pub const PREDICTED: &str = "predicted_casos_est";
/// Plot date column added by the visualizer
pub const DATE: &str = "date";

/// Whether `df` has a column called `name`
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| *c == name)
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name).map_err(|e| {
        ForecastError::DataError(format!("Column '{}' not found: {}", name, e))
    })
}

/// Get a column as nullable f64 values, casting numeric types
pub fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = column(df, name)?;
    if !col.dtype().is_numeric() {
        return Err(ForecastError::DataError(format!(
            "Column '{}' cannot be converted to f64",
            name
        )));
    }
    let cast = col.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(values)
}

/// Get a column as nullable i32 values
pub fn i32_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    let col = column(df, name)?;
    if !col.dtype().is_numeric() {
        return Err(ForecastError::DataError(format!(
            "Column '{}' cannot be converted to i32",
            name
        )));
    }
    let cast = col.cast(&DataType::Int32)?;
    let values = cast.i32()?.into_iter().collect();
    Ok(values)
}

/// Get a string column as nullable owned strings
pub fn str_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let col = column(df, name)?;
    let cast = col.cast(&DataType::Utf8)?;
    let values = cast
        .utf8()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Parse the `year_quarter` column; every row must hold a valid id
pub fn quarter_column(df: &DataFrame) -> Result<Vec<YearQuarter>> {
    str_column(df, YEAR_QUARTER)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                ForecastError::DataError(format!("Null {} at row {}", YEAR_QUARTER, row))
            })?
            .parse()
        })
        .collect()
}

/// Whether every value of the column is null (or NaN)
pub fn is_all_null(df: &DataFrame, name: &str) -> Result<bool> {
    let col = column(df, name)?;
    if col.null_count() == col.len() {
        return Ok(true);
    }
    if col.dtype().is_numeric() {
        let values = f64_column(df, name)?;
        return Ok(values.iter().all(|v| v.map_or(true, f64::is_nan)));
    }
    Ok(false)
}

/// Keep the rows where `mask` is true
pub fn filter_rows(df: &DataFrame, mask: &[bool]) -> Result<DataFrame> {
    if mask.len() != df.height() {
        return Err(ForecastError::DataError(format!(
            "Row mask length ({}) doesn't match frame height ({})",
            mask.len(),
            df.height()
        )));
    }
    let mask = BooleanChunked::from_slice("mask", mask);
    Ok(df.filter(&mask)?)
}

/// New frame holding clones of the named columns, in the given order
pub fn select_columns(df: &DataFrame, names: &[&str]) -> Result<DataFrame> {
    let columns = names
        .iter()
        .map(|name| column(df, name).cloned())
        .collect::<Result<Vec<Series>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Build the three quarter key columns for a list of quarters
pub fn quarter_key_columns(quarters: &[YearQuarter]) -> Vec<Series> {
    let ids: Vec<String> = quarters.iter().map(|q| q.to_string()).collect();
    let years: Vec<i32> = quarters.iter().map(|q| q.year()).collect();
    let numbers: Vec<i32> = quarters.iter().map(|q| q.quarter() as i32).collect();
    vec![
        Series::new(YEAR_QUARTER, ids),
        Series::new(YEAR, years),
        Series::new(QUARTER, numbers),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Series::new(YEAR_QUARTER, &["2024Q1", "2024Q2"]),
            Series::new(TARGET, &[Some(1.0), None]),
            Series::new("empty", &[None::<f64>, None]),
        ])
        .unwrap()
    }

    #[test]
    fn test_column_access() {
        let df = sample();
        assert!(has_column(&df, TARGET));
        assert!(!has_column(&df, "missing"));
        assert_eq!(f64_column(&df, TARGET).unwrap(), vec![Some(1.0), None]);
        assert!(f64_column(&df, YEAR_QUARTER).is_err());
        assert_eq!(quarter_column(&df).unwrap()[1].to_string(), "2024Q2");
    }

    #[test]
    fn test_all_null_and_filter() {
        let df = sample();
        assert!(is_all_null(&df, "empty").unwrap());
        assert!(!is_all_null(&df, TARGET).unwrap());

        let filtered = filter_rows(&df, &[false, true]).unwrap();
        assert_eq!(filtered.height(), 1);
        assert!(filter_rows(&df, &[true]).is_err());
    }
}
