//! Calendar quarter keys

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar quarter, ordered by year then quarter.
///
/// The textual form is `"2025Q1"`, which is how quarters are stored in the
/// `year_quarter` column of every frame in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearQuarter {
    year: i32,
    quarter: u32,
}

impl YearQuarter {
    /// Create a quarter key, validating the quarter number
    pub fn new(year: i32, quarter: u32) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(ForecastError::InvalidParameter(format!(
                "Quarter must be between 1 and 4, got {}",
                quarter
            )));
        }
        Ok(Self { year, quarter })
    }

    /// Quarter containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    /// Quarter containing the given month (1-12) of `year`
    pub fn from_month(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ForecastError::InvalidParameter(format!(
                "Month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self {
            year,
            quarter: (month - 1) / 3 + 1,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    /// First day of the quarter
    pub fn start_date(&self) -> NaiveDate {
        // month is always 1, 4, 7 or 10 and day 1 exists in every year
        NaiveDate::from_ymd_opt(self.year, (self.quarter - 1) * 3 + 1, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    /// The following quarter
    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self {
                year: self.year + 1,
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }

    /// Position on a continuous quarter count; consecutive quarters differ by one
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 4 + i64::from(self.quarter) - 1
    }

    /// All four quarters of `year`
    pub fn quarters_of(year: i32) -> [Self; 4] {
        [1, 2, 3, 4].map(|quarter| Self { year, quarter })
    }
}

impl fmt::Display for YearQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

impl FromStr for YearQuarter {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        let (year, quarter) = upper
            .split_once('Q')
            .ok_or_else(|| ForecastError::ParseError(format!("Invalid quarter id '{}'", s)))?;
        let year = year.trim_end_matches('-');

        let year: i32 = year
            .parse()
            .map_err(|_| ForecastError::ParseError(format!("Invalid year in quarter id '{}'", s)))?;
        let quarter: u32 = quarter.parse().map_err(|_| {
            ForecastError::ParseError(format!("Invalid quarter in quarter id '{}'", s))
        })?;

        Self::new(year, quarter).map_err(|_| {
            ForecastError::ParseError(format!("Quarter out of range in quarter id '{}'", s))
        })
    }
}
