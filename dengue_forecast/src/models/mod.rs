//! Regression models used for quarterly case forecasting

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use std::fmt::Debug;

pub mod boosting;
pub mod forest;
pub mod ridge;
pub mod tree;

pub use boosting::{BoostingConfig, GradientBoostingRegressor};
pub use forest::{ForestConfig, RandomForestRegressor};
pub use ridge::RidgeRegression;
pub use tree::{DecisionTreeRegressor, TreeConfig};

/// A regression model that can be fitted on a feature matrix and target
///
/// Rows of `x` are samples and columns are features.
pub trait Regressor: Debug + Send {
    /// Name of the model
    fn name(&self) -> &str;

    /// Fit the model, replacing any previous fit
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Whether `fit` has completed
    fn is_fitted(&self) -> bool;

    /// Per-feature importances summing to 1, if the model provides them
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// A fresh, unfitted copy with the same hyper-parameters
    fn unfitted(&self) -> Box<dyn Regressor>;
}

/// Validate a training pair before fitting
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ForecastError::ModelError(
            "Training data must have at least one row and one feature".to_string(),
        ));
    }
    if x.nrows() != y.len() {
        return Err(ForecastError::ModelError(format!(
            "Feature rows ({}) don't match target length ({})",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ForecastError::ModelError(
            "Training data contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Validate a prediction matrix against the number of fitted features
pub(crate) fn check_prediction_input(x: &Array2<f64>, n_features: Option<usize>) -> Result<()> {
    let expected = n_features
        .ok_or_else(|| ForecastError::ModelError("Model has not been fitted".to_string()))?;
    if x.ncols() != expected {
        return Err(ForecastError::ModelError(format!(
            "Expected {} features, got {}",
            expected,
            x.ncols()
        )));
    }
    Ok(())
}

/// Scale importances so they sum to 1; all-zero input stays zero
pub(crate) fn normalize(mut importances: Vec<f64>) -> Vec<f64> {
    let sum: f64 = importances.iter().sum();
    if sum > 0.0 {
        for imp in &mut importances {
            *imp /= sum;
        }
    }
    importances
}
