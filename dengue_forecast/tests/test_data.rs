mod common;

use assert_approx_eq::assert_approx_eq;
use dengue_forecast::data::{read_csv_frame, CLIMATE_COLUMNS};
use dengue_forecast::frame::{self, QUARTER, TARGET, YEAR, YEAR_QUARTER};
use dengue_forecast::{DataLoader, DataPaths, ForecastError, YearQuarter};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_quarter_frame_layout() {
    let data = common::write_synthetic_data();
    let df = data.loader().load_and_prepare_data().unwrap();

    let mut expected = vec![YEAR_QUARTER, YEAR, QUARTER, TARGET];
    expected.extend(CLIMATE_COLUMNS.iter().map(|(_, name)| *name));
    assert_eq!(df.get_column_names(), expected);

    // 2015Q1 through 2025Q4
    assert_eq!(df.height(), 44);
    let quarters = frame::quarter_column(&df).unwrap();
    assert_eq!(quarters[0].to_string(), "2015Q1");
    assert_eq!(quarters[43].to_string(), "2025Q4");
    assert!(quarters.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_cases_are_summed_per_quarter() {
    let data = common::write_synthetic_data();
    let quarters = data.loader().load_case_quarters().unwrap();

    let q1 = YearQuarter::new(2015, 1).unwrap();
    let mut expected = 0.0;
    let mut day = common::date(2015, 1, 4);
    while day < common::date(2015, 4, 1) {
        expected += common::weekly_cases(day, 120.0) + common::weekly_cases(day, 45.0);
        day += chrono::Duration::days(7);
    }
    assert_approx_eq!(quarters[&q1], expected, 1e-6);
}

#[test]
fn test_climate_is_quarterly_mean() {
    let data = common::write_synthetic_data();
    let climate = data.loader().load_climate_quarters().unwrap();

    let q = YearQuarter::new(2020, 3).unwrap();
    let expected: f64 = (7..=9)
        .map(|month| {
            let t = 6.0 * 12.0 + month as f64;
            let anom: f64 = (t / 9.0).sin();
            // written with two decimals
            ((0.9 * anom) * 100.0).round() / 100.0
        })
        .sum::<f64>()
        / 3.0;
    assert_approx_eq!(climate[&q].values["nino34_anom"], expected, 1e-9);
}

#[test]
fn test_incomplete_quarters_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths {
        dengue: dir.path().join("cases.csv"),
        sst: dir.path().join("sst.csv"),
    };
    // 2020Q1 is complete, 2020Q2 only has four weeks
    common::write_cases(&paths.dengue, common::date(2020, 1, 5), common::date(2020, 4, 26));
    common::write_sst(&paths.sst, 2020..=2020);

    let df = DataLoader::with_paths(paths.clone())
        .load_and_prepare_data()
        .unwrap();
    assert_eq!(df.height(), 1);

    let df = DataLoader::with_paths(paths)
        .with_min_weeks(4)
        .load_and_prepare_data()
        .unwrap();
    assert_eq!(df.height(), 2);
}

#[test]
fn test_climate_is_null_outside_sst_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths {
        dengue: dir.path().join("cases.csv"),
        sst: dir.path().join("sst.csv"),
    };
    common::write_cases(&paths.dengue, common::date(2019, 1, 6), common::date(2020, 12, 27));
    common::write_sst(&paths.sst, 2020..=2020);

    let df = DataLoader::with_paths(paths).load_and_prepare_data().unwrap();
    let nino = frame::f64_column(&df, "nino34").unwrap();
    assert!(nino[..4].iter().all(Option::is_none));
    assert!(nino[4..].iter().all(Option::is_some));
}

#[test]
fn test_missing_file_names_path() {
    let loader = DataLoader::with_paths(DataPaths {
        dengue: "does/not/exist.csv".into(),
        sst: "does/not/exist_either.csv".into(),
    });
    let err = loader.load_and_prepare_data().unwrap_err();
    assert!(matches!(err, ForecastError::IoError(_)));
    assert!(err.to_string().contains("does/not/exist.csv"));
}

#[test]
fn test_missing_dengue_column_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "data_iniSE,casos").unwrap();
    writeln!(file, "2024-01-07,10").unwrap();

    let data = common::write_synthetic_data();
    let loader = DataLoader::with_paths(DataPaths {
        dengue: file.path().to_path_buf(),
        sst: data.paths.sst.clone(),
    });
    let err = loader.load_dengue_frame().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Data quality error: [dengue] Missing columns: [casos_est]"
    );
}

#[test]
fn test_duplicate_headers_are_disambiguated() {
    let data = common::write_synthetic_data();
    let sst = read_csv_frame(&data.paths.sst).unwrap();
    let names = sst.get_column_names();
    assert_eq!(
        names,
        vec!["YR", "MON", "NINO1+2", "ANOM", "NINO3", "ANOM.1", "NINO4", "ANOM.2", "NINO3.4", "ANOM.3"]
    );
}

#[test]
fn test_unparseable_week_date() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "data_iniSE,casos_est").unwrap();
    writeln!(file, "not a date,10").unwrap();

    let data = common::write_synthetic_data();
    let loader = DataLoader::with_paths(DataPaths {
        dengue: file.path().to_path_buf(),
        sst: data.paths.sst.clone(),
    });
    assert!(matches!(
        loader.load_case_quarters(),
        Err(ForecastError::ParseError(_))
    ));
}
