mod common;

use dengue_forecast::data::{DENGUE_REQUIRED_COLUMNS, SST_REQUIRED_COLUMNS};
use dengue_forecast::data_quality::{
    check_feature_columns, check_forecast_shape, check_required_columns, missing_columns,
};
use dengue_forecast::frame::{self, PREDICTED, YEAR_QUARTER};
use dengue_forecast::{FeatureEngineer, ForecastError, Forecaster, ModelTrainer};
use polars::prelude::*;
use pretty_assertions::assert_eq;

#[test]
fn test_data_quality() {
    let data = common::write_synthetic_data();
    assert!(data.paths.dengue.exists());
    assert!(data.paths.sst.exists());

    let loader = data.loader();
    let dengue = loader.load_dengue_frame().unwrap();
    let sst = loader.load_sst_frame().unwrap();

    assert!(missing_columns(&dengue, &DENGUE_REQUIRED_COLUMNS).is_empty());
    assert!(missing_columns(&sst, &SST_REQUIRED_COLUMNS).is_empty());
}

#[test]
fn test_features_exist_and_not_all_null() {
    let data = common::write_synthetic_data();
    let df = data.loader().load_and_prepare_data().unwrap();

    let engineer = FeatureEngineer::new();
    let (df_feat, feature_cols) = engineer.create_features(&df).unwrap();

    assert!(!feature_cols.is_empty());
    let missing: Vec<&String> = feature_cols
        .iter()
        .filter(|c| !frame::has_column(&df_feat, c))
        .collect();
    assert!(missing.is_empty(), "Missing engineered features: {:?}", missing);

    let all_null: Vec<&String> = feature_cols
        .iter()
        .filter(|c| frame::is_all_null(&df_feat, c).unwrap())
        .collect();
    assert!(all_null.is_empty(), "All-null feature columns: {:?}", all_null);

    engineer.validate_features(&df_feat, &feature_cols).unwrap();
}

#[test]
fn test_forecast_shape() {
    let data = common::write_synthetic_data();
    let df = data.loader().load_and_prepare_data().unwrap();

    let engineer = FeatureEngineer::new();
    let (df_feat, feature_cols) = engineer.create_features(&df).unwrap();
    let forecaster = Forecaster::new(engineer);

    let trainer = ModelTrainer::new();
    let (_, base_model) = trainer.models().next().unwrap();

    let run = forecaster
        .refit_and_forecast(&df_feat, &feature_cols, base_model, 2026, 2025, &[2024])
        .unwrap();

    assert_eq!(run.forecast.height(), 4);
    assert!(frame::has_column(&run.forecast, YEAR_QUARTER));
    assert!(frame::has_column(&run.forecast, PREDICTED));
}

#[test]
fn test_missing_columns_are_named() {
    let df = DataFrame::new(vec![Series::new("YR", &[2024]), Series::new("MON", &[1])]).unwrap();

    let err = check_required_columns(&df, &SST_REQUIRED_COLUMNS, "sst").unwrap_err();
    match err {
        ForecastError::DataQuality(msg) => {
            assert_eq!(msg, "[sst] Missing columns: [ANOM.3, NINO1+2, NINO3, NINO3.4]")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_feature_check_messages() {
    let df = DataFrame::new(vec![
        Series::new("a", &[Some(1.0), None]),
        Series::new("b", &[None::<f64>, None]),
    ])
    .unwrap();

    let err = check_feature_columns(&df, &[]).unwrap_err();
    assert!(err.to_string().contains("No feature columns returned"));

    let cols = vec!["a".to_string(), "c".to_string()];
    let err = check_feature_columns(&df, &cols).unwrap_err();
    assert!(err.to_string().contains("Missing engineered features: [c]"));

    let cols = vec!["a".to_string(), "b".to_string()];
    let err = check_feature_columns(&df, &cols).unwrap_err();
    assert!(err.to_string().contains("All-null feature columns: [b]"));
}

#[test]
fn test_forecast_shape_rejects_wrong_year() {
    let mut columns = frame::quarter_key_columns(&dengue_forecast::YearQuarter::quarters_of(2025));
    columns.push(Series::new(PREDICTED, &[1.0, 2.0, 3.0, 4.0]));
    let df = DataFrame::new(columns).unwrap();

    assert!(check_forecast_shape(&df, 2025).is_ok());
    assert!(matches!(
        check_forecast_shape(&df, 2026),
        Err(ForecastError::ForecastingError(_))
    ));
    assert!(check_forecast_shape(&df.head(Some(3)), 2025).is_err());
}
