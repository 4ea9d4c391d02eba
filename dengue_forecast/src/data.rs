//! Loading and quarterly alignment of case counts and climate indices

use crate::data_quality::check_required_columns;
use crate::error::{ForecastError, Result};
use crate::frame::{self, quarter_key_columns, TARGET};
use crate::quarter::YearQuarter;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Epidemiological week start date column
pub const WEEK_START: &str = "data_iniSE";

/// Columns the case file must provide
pub const DENGUE_REQUIRED_COLUMNS: [&str; 2] = [WEEK_START, TARGET];

/// Columns the SST index file must provide
pub const SST_REQUIRED_COLUMNS: [&str; 6] = ["YR", "MON", "NINO1+2", "NINO3", "NINO3.4", "ANOM.3"];

/// Raw SST column and the quarter frame column it becomes
pub const CLIMATE_COLUMNS: [(&str, &str); 4] = [
    ("NINO1+2", "nino12"),
    ("NINO3", "nino3"),
    ("NINO3.4", "nino34"),
    ("ANOM.3", "nino34_anom"),
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const NULL_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

/// Locations of the two input files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPaths {
    pub dengue: PathBuf,
    pub sst: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            dengue: PathBuf::from("data/infodengue_capitals_subsetBR.csv"),
            sst: PathBuf::from("data/sst_indices.csv"),
        }
    }
}

/// Quarterly mean of each climate index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimateQuarter {
    /// Values keyed by quarter frame column name (`nino12`, ...)
    pub values: BTreeMap<String, f64>,
}

/// Loader producing the unified per-quarter frame
#[derive(Debug, Clone)]
pub struct DataLoader {
    paths: DataPaths,
    min_weeks_per_quarter: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Loader for the default file locations
    pub fn new() -> Self {
        Self::with_paths(DataPaths::default())
    }

    /// Loader for custom file locations
    pub fn with_paths(paths: DataPaths) -> Self {
        Self {
            paths,
            min_weeks_per_quarter: 10,
        }
    }

    /// Set the number of distinct epidemiological weeks a quarter needs to be kept
    pub fn with_min_weeks(mut self, min_weeks: usize) -> Self {
        self.min_weeks_per_quarter = min_weeks;
        self
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Read and validate the case file
    pub fn load_dengue_frame(&self) -> Result<DataFrame> {
        let df = read_csv_frame(&self.paths.dengue)?;
        check_required_columns(&df, &DENGUE_REQUIRED_COLUMNS, "dengue")?;
        Ok(df)
    }

    /// Read and validate the SST index file
    pub fn load_sst_frame(&self) -> Result<DataFrame> {
        let df = read_csv_frame(&self.paths.sst)?;
        check_required_columns(&df, &SST_REQUIRED_COLUMNS, "sst")?;
        Ok(df)
    }

    /// Average the monthly SST indices per calendar quarter
    pub fn load_climate_quarters(&self) -> Result<BTreeMap<YearQuarter, ClimateQuarter>> {
        let sst = self.load_sst_frame()?;
        let years = frame::i32_column(&sst, "YR")?;
        let months = frame::i32_column(&sst, "MON")?;

        let mut sums: BTreeMap<YearQuarter, HashMap<&str, (f64, usize)>> = BTreeMap::new();
        for (raw, name) in CLIMATE_COLUMNS {
            let values = frame::f64_column(&sst, raw)?;
            for (row, value) in values.iter().enumerate() {
                let (Some(year), Some(month)) = (years[row], months[row]) else {
                    continue;
                };
                let yq = YearQuarter::from_month(year, month as u32).map_err(|_| {
                    ForecastError::DataError(format!(
                        "Invalid month {} at row {} of the SST file",
                        month, row
                    ))
                })?;
                let entry = sums.entry(yq).or_default().entry(name).or_insert((0.0, 0));
                if let Some(v) = value.filter(|v| v.is_finite()) {
                    entry.0 += v;
                    entry.1 += 1;
                }
            }
        }

        let climate = sums
            .into_iter()
            .map(|(yq, columns)| {
                let values = columns
                    .into_iter()
                    .filter(|(_, (_, n))| *n > 0)
                    .map(|(name, (sum, n))| (name.to_string(), sum / n as f64))
                    .collect();
                (yq, ClimateQuarter { values })
            })
            .collect::<BTreeMap<_, _>>();

        debug!("Loaded climate indices for {} quarters", climate.len());
        Ok(climate)
    }

    /// Aggregate weekly case counts to complete quarters
    pub fn load_case_quarters(&self) -> Result<BTreeMap<YearQuarter, f64>> {
        let dengue = self.load_dengue_frame()?;
        let dates = frame::str_column(&dengue, WEEK_START)?;
        let cases = frame::f64_column(&dengue, TARGET)?;

        let mut totals: BTreeMap<YearQuarter, (f64, BTreeSet<NaiveDate>)> = BTreeMap::new();
        for (row, (date, count)) in dates.iter().zip(cases.iter()).enumerate() {
            let Some(date) = date else {
                warn!("Skipping row {} with no {}", row, WEEK_START);
                continue;
            };
            let date = parse_week_start(date)?;
            let entry = totals.entry(YearQuarter::from_date(date)).or_default();
            if let Some(count) = count.filter(|c| c.is_finite()) {
                entry.0 += count;
            }
            entry.1.insert(date);
        }

        let before = totals.len();
        let quarters: BTreeMap<YearQuarter, f64> = totals
            .into_iter()
            .filter(|(yq, (_, weeks))| {
                let complete = weeks.len() >= self.min_weeks_per_quarter;
                if !complete {
                    info!(
                        "Dropping incomplete quarter {} ({} weeks)",
                        yq,
                        weeks.len()
                    );
                }
                complete
            })
            .map(|(yq, (total, _))| (yq, total))
            .collect();

        debug!(
            "Aggregated case counts into {} quarters ({} incomplete dropped)",
            quarters.len(),
            before - quarters.len()
        );
        Ok(quarters)
    }

    /// Load both sources and join them into the quarter frame.
    ///
    /// Columns: `year_quarter`, `year`, `quarter`, `casos_est`, `nino12`,
    /// `nino3`, `nino34`, `nino34_anom`. Climate values are null for quarters
    /// the SST file does not cover.
    pub fn load_and_prepare_data(&self) -> Result<DataFrame> {
        let cases = self.load_case_quarters()?;
        if cases.is_empty() {
            return Err(ForecastError::DataError(
                "No complete quarters in the case data".to_string(),
            ));
        }
        let climate = self.load_climate_quarters()?;

        let quarters: Vec<YearQuarter> = cases.keys().copied().collect();
        let mut columns = quarter_key_columns(&quarters);
        columns.push(Series::new(TARGET, cases.values().copied().collect::<Vec<f64>>()));

        for (_, name) in CLIMATE_COLUMNS {
            let values: Vec<Option<f64>> = quarters
                .iter()
                .map(|yq| climate.get(yq).and_then(|c| c.values.get(name).copied()))
                .collect();
            columns.push(Series::new(name, values));
        }

        let df = DataFrame::new(columns)?;
        info!(
            "Prepared {} quarters from {} to {}",
            df.height(),
            quarters[0],
            quarters[quarters.len() - 1]
        );
        Ok(df)
    }
}

/// Parse an epidemiological week start date
pub fn parse_week_start(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map(|dt| dt.date())
        .map_err(|_| ForecastError::ParseError(format!("Invalid {} date '{}'", WEEK_START, value)))
}

/// Rename repeated headers to `name`, `name.1`, `name.2`, ...
pub fn deduplicate_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let count = seen.entry(header.as_str()).or_insert(0);
        if *count == 0 {
            out.push(header.clone());
        } else {
            let mut candidate = format!("{}.{}", header, count);
            // skip suffixes that collide with a literal header
            while headers.contains(&candidate) || out.contains(&candidate) {
                *count += 1;
                candidate = format!("{}.{}", header, count);
            }
            out.push(candidate);
        }
        *count += 1;
    }
    out
}

/// Read a CSV file into a frame.
///
/// Fields are trimmed, duplicate headers are disambiguated, and a column is
/// typed as f64 when every non-null cell parses as a number, otherwise it is
/// kept as a string column.
pub fn read_csv_frame<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ForecastError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Missing dataset: {}", path.display()),
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let raw_headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let headers = deduplicate_headers(&raw_headers);
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record
                .get(i)
                .filter(|c| !NULL_TOKENS.contains(c))
                .map(str::to_string);
            column.push(cell);
        }
    }

    let columns: Vec<Series> = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| typed_series(name, values))
        .collect();

    let df = DataFrame::new(columns)?;
    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

fn typed_series(name: &str, values: Vec<Option<String>>) -> Series {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|v| match v {
            Some(s) => s.parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect();

    match parsed {
        Some(numbers) if values.iter().any(Option::is_some) => Series::new(name, numbers),
        _ => Series::new(name, values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_deduplicate_headers() {
        let headers: Vec<String> = ["YR", "MON", "NINO1+2", "ANOM", "NINO3", "ANOM", "ANOM"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = deduplicate_headers(&headers);
        assert_eq!(out[3], "ANOM");
        assert_eq!(out[5], "ANOM.1");
        assert_eq!(out[6], "ANOM.2");
    }

    #[test]
    fn test_read_csv_frame_types() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "name, value").unwrap();
        writeln!(file, "a, 1.5").unwrap();
        writeln!(file, "b, NA").unwrap();

        let df = read_csv_frame(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("value").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("name").unwrap().dtype(), &DataType::Utf8);
        assert_eq!(df.column("value").unwrap().null_count(), 1);
    }

    #[test]
    fn test_parse_week_start_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(parse_week_start("2024-01-07").unwrap(), expected);
        assert_eq!(parse_week_start("07/01/2024").unwrap(), expected);
        assert_eq!(parse_week_start("2024-01-07 00:00:00").unwrap(), expected);
        assert!(parse_week_start("week 1").is_err());
    }
}
