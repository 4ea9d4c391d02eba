//! Error types for the dengue_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the dengue_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data loading or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Missing columns, missing features or all-null features
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error related to input validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error raised by a regression model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error raised while rendering a chart
    #[error("Visualization error: {0}")]
    VisualizationError(String),

    /// Error parsing a date or quarter identifier
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error reading or writing CSV
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error encoding a PNG image
    #[error("Image error: {0}")]
    ImageError(#[from] png::EncodingError),

    /// Error reading or writing JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from the series math crate
    #[error("Math error: {0}")]
    MathError(#[from] epi_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
