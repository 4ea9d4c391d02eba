//! Ridge regression baseline

use super::{check_prediction_input, check_training_data, normalize, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, Axis};

/// L2-regularized linear regression on standardized features
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    name: String,
    alpha: f64,
    /// Coefficients on the original feature scale
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    /// |coefficient| on the standardized scale, normalized
    importances: Vec<f64>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self {
            name: "ridge".to_string(),
            alpha: 1.0,
            coefficients: None,
            intercept: 0.0,
            importances: Vec::new(),
        }
    }
}

impl RidgeRegression {
    /// Create a ridge model with the given regularization strength
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "alpha must be positive, got {}",
                alpha
            )));
        }
        Ok(Self {
            alpha,
            ..Default::default()
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Solve `a * x = b` for symmetric positive definite `a`
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return Err(ForecastError::ModelError(
                        "Normal equations are not positive definite".to_string(),
                    ));
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * z[j]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // back substitution: L^T x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

impl Regressor for RidgeRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n = x.nrows() as f64;

        let means = x.mean_axis(Axis(0)).ok_or_else(|| {
            ForecastError::ModelError("Cannot standardize an empty matrix".to_string())
        })?;
        // constant columns keep a unit scale and end up with a zero coefficient
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let z = (x - &means) / &scales;

        let y_mean = y.sum() / n;
        let y_centered = y - y_mean;

        let mut gram = z.t().dot(&z);
        for i in 0..gram.nrows() {
            gram[[i, i]] += self.alpha;
        }
        let rhs = z.t().dot(&y_centered);
        let beta = cholesky_solve(&gram, &rhs)?;

        let coefficients = &beta / &scales;
        self.intercept = y_mean - coefficients.dot(&means);
        self.importances = normalize(beta.iter().map(|b| b.abs()).collect());
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.coefficients.as_ref().map(|c| c.len()))?;
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| ForecastError::ModelError("Model has not been fitted".to_string()))?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.is_fitted().then(|| self.importances.clone())
    }

    fn unfitted(&self) -> Box<dyn Regressor> {
        Box::new(Self {
            alpha: self.alpha,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn test_recovers_linear_relation() {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 7) as f64 });
        let y: Array1<f64> = x.rows().into_iter().map(|r| 3.0 * r[0] - 2.0 * r[1] + 5.0).collect();

        let mut model = RidgeRegression::new(1e-6).unwrap();
        model.fit(&x, &y).unwrap();

        let coefficients = model.coefficients().unwrap();
        assert_approx_eq!(coefficients[0], 3.0, 1e-3);
        assert_approx_eq!(coefficients[1], -2.0, 1e-3);
        assert_approx_eq!(model.intercept(), 5.0, 1e-2);

        let pred = model.predict(&array![[10.0, 3.0]]).unwrap();
        assert_approx_eq!(pred[0], 29.0, 1e-2);
    }

    #[test]
    fn test_constant_column_gets_no_weight() {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| if j == 0 { i as f64 } else { 4.0 });
        let y: Array1<f64> = (0..10).map(|i| i as f64 * 2.0).collect();

        let mut model = RidgeRegression::default();
        model.fit(&x, &y).unwrap();

        let importances = model.feature_importances().unwrap();
        assert_eq!(importances[1], 0.0);
        assert_approx_eq!(importances[0], 1.0);
    }

    #[test]
    fn test_rejects_non_positive_alpha() {
        assert!(RidgeRegression::new(0.0).is_err());
        assert!(RidgeRegression::new(-1.0).is_err());
        assert!(!RidgeRegression::default().is_fitted());
    }
}
