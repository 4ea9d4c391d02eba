use dengue_forecast::error::ForecastError;
use dengue_forecast::data::parse_week_start;
use polars::prelude::*;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    assert!(matches!(ForecastError::from(io_error), ForecastError::IoError(_)));

    let polars_error = DataFrame::empty().column("missing").unwrap_err();
    assert!(matches!(
        ForecastError::from(polars_error),
        ForecastError::PolarsError(_)
    ));

    let math_error = epi_math::RollingWindow::new(0).unwrap_err();
    assert!(matches!(
        ForecastError::from(math_error),
        ForecastError::MathError(_)
    ));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        ForecastError::from(json_error),
        ForecastError::JsonError(_)
    ));
}

#[test]
fn test_error_display() {
    let error = ForecastError::DataQuality("[sst] Missing columns: [YR]".to_string());
    assert_eq!(
        error.to_string(),
        "Data quality error: [sst] Missing columns: [YR]"
    );

    let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
    let error_string = ForecastError::from(io_error).to_string();
    assert!(error_string.contains("IO error"));
    assert!(error_string.contains("permission denied"));

    let math_error = epi_math::RollingWindow::new(0).unwrap_err();
    assert_eq!(
        ForecastError::from(math_error).to_string(),
        "Math error: Invalid input: Period must be greater than zero"
    );
}

#[test]
fn test_parse_errors_name_the_value() {
    match parse_week_start("week 12") {
        Err(ForecastError::ParseError(msg)) => assert!(msg.contains("week 12")),
        other => panic!("Expected ParseError, got {:?}", other),
    }
    assert!(parse_week_start("2024-01-07").is_ok());
    assert!(parse_week_start("07/01/2024").is_ok());
}

#[test]
fn test_result_mapping() {
    let result: Result<(), &str> = Err("no rows");
    let mapped = result.map_err(|e| ForecastError::ForecastingError(e.to_string()));

    if let Err(ForecastError::ForecastingError(msg)) = mapped {
        assert_eq!(msg, "no rows");
    } else {
        panic!("Wrong error variant");
    }
}
