#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate};
use dengue_forecast::{DataLoader, DataPaths};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Relative weekly incidence by month, peaking in March
const MONTHLY_SEASON: [f64; 12] = [1.0, 1.6, 1.9, 1.4, 0.8, 0.5, 0.3, 0.25, 0.25, 0.3, 0.5, 0.8];

/// Generated input files kept alive with their directory
pub struct SyntheticData {
    pub dir: TempDir,
    pub paths: DataPaths,
}

impl SyntheticData {
    pub fn loader(&self) -> DataLoader {
        DataLoader::with_paths(self.paths.clone())
    }
}

/// Weekly cases for two cities from 2015-01-04 to 2025-12-28 and monthly
/// SST indices for 2014-2025, with the raw file's repeated `ANOM` headers
pub fn write_synthetic_data() -> SyntheticData {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths {
        dengue: dir.path().join("infodengue_capitals_subsetBR.csv"),
        sst: dir.path().join("sst_indices.csv"),
    };
    write_cases(&paths.dengue, date(2015, 1, 4), date(2025, 12, 28));
    write_sst(&paths.sst, 2014..=2025);
    SyntheticData { dir, paths }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Cases per city-week on `date`
pub fn weekly_cases(date: NaiveDate, scale: f64) -> f64 {
    let season = MONTHLY_SEASON[date.month0() as usize];
    let trend = 1.0 + 0.04 * (date.year() - 2015) as f64;
    (scale * season * trend * 10.0).round() / 10.0
}

pub fn write_cases(path: &Path, start: NaiveDate, end: NaiveDate) {
    let mut file = File::create(path).unwrap();
    writeln!(file, "data_iniSE,casos_est,municipio").unwrap();
    let mut day = start;
    while day <= end {
        for (city, scale) in [("Rio de Janeiro", 120.0), ("Recife", 45.0)] {
            writeln!(file, "{},{},{}", day, weekly_cases(day, scale), city).unwrap();
        }
        day += Duration::days(7);
    }
}

pub fn write_sst(path: &Path, years: std::ops::RangeInclusive<i32>) {
    let mut file = File::create(path).unwrap();
    writeln!(file, "YR,MON,NINO1+2,ANOM,NINO3,ANOM,NINO4,ANOM,NINO3.4,ANOM").unwrap();
    for year in years {
        for month in 1..=12 {
            let t = (year - 2014) as f64 * 12.0 + month as f64;
            let anom = (t / 9.0).sin();
            writeln!(
                file,
                "{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
                year,
                month,
                23.0 + anom,
                anom,
                25.5 + 0.8 * anom,
                0.8 * anom,
                28.5,
                0.1,
                27.0 + 0.9 * anom,
                0.9 * anom
            )
            .unwrap();
        }
    }
}
