//! # Epi Math
//!
//! Numeric primitives for quarterly epidemiological series.
//! Series are slices of `Option<f64>`: a `None` marks a missing observation
//! and propagates through every derived value that depends on it.

use thiserror::Error;

pub mod rolling;
pub mod seasonal;
pub mod series;

pub use rolling::{rolling_mean, rolling_std, RollingWindow};
pub use seasonal::{quarter_cos, quarter_one_hot, quarter_sin};
pub use series::{lag, log1p, pct_change};

/// Errors that can occur in series calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
