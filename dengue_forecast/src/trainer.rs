//! Model registry and held-out year evaluation

use crate::error::{ForecastError, Result};
use crate::frame::{self, TARGET, YEAR};
use crate::metrics::{forecast_accuracy, ForecastAccuracy};
use crate::models::{
    DecisionTreeRegressor, GradientBoostingRegressor, RandomForestRegressor, Regressor,
    RidgeRegression,
};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use tracing::{debug, info};

/// Column names of an importance frame
pub const FEATURE: &str = "Feature";
pub const IMPORTANCE: &str = "Importance";

/// Design matrix with the frame rows it was built from
#[derive(Debug, Clone)]
pub struct TrainingMatrix {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// Row positions in the source frame
    pub rows: Vec<usize>,
}

/// Result of evaluating one model on one held-out year
#[derive(Debug, Clone)]
pub struct ModelEvaluation {
    /// Registered model name
    pub name: String,
    /// Held-out year
    pub year: i32,
    pub metrics: ForecastAccuracy,
    /// Rows of the held-out year that were predicted
    pub test_frame: DataFrame,
    /// One prediction per row of `test_frame`
    pub predictions: Vec<f64>,
    /// Importance frame of the fitted model, when it provides importances
    pub importance: Option<DataFrame>,
}

/// Map a case count onto the training scale
pub fn encode_target(value: f64, log_target: bool) -> f64 {
    if log_target {
        value.max(0.0).ln_1p()
    } else {
        value
    }
}

/// Map a model output back to a non-negative case count
pub fn decode_prediction(value: f64, log_target: bool) -> f64 {
    let cases = if log_target { value.exp_m1() } else { value };
    cases.max(0.0)
}

/// Holds the ordered set of candidate models
#[derive(Debug)]
pub struct ModelTrainer {
    models: Vec<(String, Box<dyn Regressor>)>,
    log_target: bool,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelTrainer {
    /// Register the default models: gradient boosting, random forest,
    /// decision tree and the ridge baseline
    pub fn new() -> Self {
        let models: Vec<Box<dyn Regressor>> = vec![
            Box::new(GradientBoostingRegressor::default()),
            Box::new(RandomForestRegressor::default()),
            Box::new(DecisionTreeRegressor::default()),
            Box::new(RidgeRegression::default()),
        ];
        Self {
            models: models
                .into_iter()
                .map(|m| (m.name().to_string(), m))
                .collect(),
            log_target: true,
        }
    }

    /// A trainer with no registered models
    pub fn empty() -> Self {
        Self {
            models: Vec::new(),
            log_target: true,
        }
    }

    pub fn with_log_target(mut self, log_target: bool) -> Self {
        self.log_target = log_target;
        self
    }

    pub fn log_target(&self) -> bool {
        self.log_target
    }

    /// Registered models in order
    pub fn models(&self) -> impl Iterator<Item = (&str, &dyn Regressor)> {
        self.models.iter().map(|(name, m)| (name.as_str(), m.as_ref()))
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Regressor> {
        self.models
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.as_ref())
    }

    /// Replace the model registered under `name`, or append it
    pub fn insert(&mut self, name: &str, model: Box<dyn Regressor>) {
        match self.models.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = model,
            None => self.models.push((name.to_string(), model)),
        }
    }

    /// Evaluate every model on `test_year`.
    ///
    /// Each model is refitted from an unfitted copy on rows with
    /// `year < test_year` outside `exclude_years`, then predicts the
    /// `test_year` rows from their observed lags.
    pub fn evaluate_year(
        &self,
        df_feat: &DataFrame,
        feature_cols: &[String],
        test_year: i32,
        exclude_years: &[i32],
    ) -> Result<Vec<ModelEvaluation>> {
        let train = training_matrix(df_feat, feature_cols, |year| {
            year < test_year && !exclude_years.contains(&year)
        })?;
        let test = training_matrix(df_feat, feature_cols, |year| year == test_year)?;
        if train.rows.is_empty() {
            return Err(ForecastError::ValidationError(format!(
                "No complete training rows before {}",
                test_year
            )));
        }
        if test.rows.is_empty() {
            return Err(ForecastError::ValidationError(format!(
                "No complete rows to evaluate for {}",
                test_year
            )));
        }

        let mut mask = vec![false; df_feat.height()];
        for &row in &test.rows {
            mask[row] = true;
        }
        let test_frame = frame::filter_rows(df_feat, &mask)?;
        let actual = test.y.to_vec();

        info!(
            "Evaluating {} models on {} ({} train rows, {} test rows)",
            self.models.len(),
            test_year,
            train.rows.len(),
            test.rows.len()
        );

        let mut evaluations = Vec::with_capacity(self.models.len());
        for (name, base) in &self.models {
            let model = fit_model(base.as_ref(), &train.x, &train.y, self.log_target)?;
            let predictions = predict_cases(model.as_ref(), &test.x, self.log_target)?;
            let metrics = forecast_accuracy(&predictions, &actual)?;
            debug!("{} on {}: MAE {:.2}, RMSE {:.2}", name, test_year, metrics.mae, metrics.rmse);

            let importance = match model.feature_importances() {
                Some(values) => Some(importance_frame(feature_cols, &values, feature_cols.len())?),
                None => None,
            };

            evaluations.push(ModelEvaluation {
                name: name.clone(),
                year: test_year,
                metrics,
                test_frame: test_frame.clone(),
                predictions,
                importance,
            });
        }
        Ok(evaluations)
    }
}

/// Name of the model with the lowest mean MAE across `evaluations`.
///
/// Ties go to the model evaluated first.
pub fn best_model(evaluations: &[ModelEvaluation]) -> Option<String> {
    let mut totals: Vec<(&str, f64, usize)> = Vec::new();
    for eval in evaluations {
        match totals.iter_mut().find(|(name, _, _)| *name == eval.name) {
            Some(entry) => {
                entry.1 += eval.metrics.mae;
                entry.2 += 1;
            }
            None => totals.push((eval.name.as_str(), eval.metrics.mae, 1)),
        }
    }

    totals
        .into_iter()
        .map(|(name, total, count)| (name, total / count as f64))
        .filter(|(_, mae)| !mae.is_nan())
        .fold(None::<(&str, f64)>, |best, (name, mae)| match best {
            Some((_, best_mae)) if best_mae <= mae => best,
            _ => Some((name, mae)),
        })
        .map(|(name, _)| name.to_string())
}

/// Build a design matrix from the rows whose year passes `row_filter` and
/// whose features and target are all present
pub fn training_matrix<F>(
    df: &DataFrame,
    feature_cols: &[String],
    row_filter: F,
) -> Result<TrainingMatrix>
where
    F: Fn(i32) -> bool,
{
    let years = frame::i32_column(df, YEAR)?;
    let target = frame::f64_column(df, TARGET)?;
    let features = feature_cols
        .iter()
        .map(|c| frame::f64_column(df, c))
        .collect::<Result<Vec<_>>>()?;

    let complete = |row: usize| -> bool {
        target[row].map_or(false, f64::is_finite)
            && features
                .iter()
                .all(|col| col[row].map_or(false, f64::is_finite))
    };

    let rows: Vec<usize> = (0..df.height())
        .filter(|&row| years[row].map_or(false, &row_filter) && complete(row))
        .collect();

    let x = Array2::from_shape_fn((rows.len(), features.len()), |(i, j)| {
        features[j][rows[i]].unwrap_or(f64::NAN)
    });
    let y: Array1<f64> = rows
        .iter()
        .map(|&row| target[row].unwrap_or(f64::NAN))
        .collect();

    Ok(TrainingMatrix { x, y, rows })
}

/// Fit an unfitted copy of `base` on the training pair
pub fn fit_model(
    base: &dyn Regressor,
    x: &Array2<f64>,
    y: &Array1<f64>,
    log_target: bool,
) -> Result<Box<dyn Regressor>> {
    let mut model = base.unfitted();
    let y_train = y.mapv(|v| encode_target(v, log_target));
    model.fit(x, &y_train)?;
    Ok(model)
}

/// Predict case counts on the original scale
pub fn predict_cases(model: &dyn Regressor, x: &Array2<f64>, log_target: bool) -> Result<Vec<f64>> {
    Ok(model
        .predict(x)?
        .iter()
        .map(|&p| decode_prediction(p, log_target))
        .collect())
}

/// Importance frame sorted descending, keeping the `top_n` largest
pub fn importance_frame(names: &[String], importances: &[f64], top_n: usize) -> Result<DataFrame> {
    if names.len() != importances.len() {
        return Err(ForecastError::ValidationError(format!(
            "{} feature names but {} importances",
            names.len(),
            importances.len()
        )));
    }

    let mut pairs: Vec<(&String, f64)> = names.iter().zip(importances.iter().copied()).collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
    pairs.truncate(top_n);

    let features: Vec<&str> = pairs.iter().map(|(n, _)| n.as_str()).collect();
    let values: Vec<f64> = pairs.iter().map(|(_, v)| *v).collect();
    Ok(DataFrame::new(vec![
        Series::new(FEATURE, features),
        Series::new(IMPORTANCE, values),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation(name: &str, year: i32, mae: f64) -> ModelEvaluation {
        let mut metrics = forecast_accuracy(&[1.0], &[1.0]).unwrap();
        metrics.mae = mae;
        ModelEvaluation {
            name: name.to_string(),
            year,
            metrics,
            test_frame: DataFrame::empty(),
            predictions: vec![1.0],
            importance: None,
        }
    }

    #[test]
    fn test_default_model_order() {
        let trainer = ModelTrainer::new();
        let names: Vec<&str> = trainer.models().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["gradient_boosting", "random_forest", "decision_tree", "ridge"]
        );
        assert!(trainer.log_target());
        assert!(trainer.models().all(|(_, m)| !m.is_fitted()));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut trainer = ModelTrainer::new();
        trainer.insert("decision_tree", Box::new(RidgeRegression::default()));
        trainer.insert("extra", Box::new(RidgeRegression::default()));

        assert_eq!(trainer.model_names()[2], "decision_tree");
        assert_eq!(trainer.get("decision_tree").map(|m| m.name()), Some("ridge"));
        assert_eq!(trainer.model_names().len(), 5);
    }

    #[test]
    fn test_best_model_averages_years() {
        let evals = vec![
            evaluation("a", 2023, 10.0),
            evaluation("b", 2023, 5.0),
            evaluation("a", 2024, 10.0),
            evaluation("b", 2024, 20.0),
        ];
        assert_eq!(best_model(&evals).as_deref(), Some("a"));
        assert_eq!(best_model(&[]), None);
    }

    #[test]
    fn test_target_transform() {
        assert_eq!(encode_target(0.0, true), 0.0);
        assert!((decode_prediction(encode_target(250.0, true), true) - 250.0).abs() < 1e-9);
        assert_eq!(decode_prediction(-3.0, false), 0.0);
        assert_eq!(decode_prediction(-3.0, true), 0.0);
    }

    #[test]
    fn test_importance_frame_sorted_and_truncated() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let df = importance_frame(&names, &[0.2, 0.5, 0.3], 2).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(
            frame::str_column(&df, FEATURE).unwrap(),
            vec![Some("b".to_string()), Some("c".to_string())]
        );
        assert!(importance_frame(&names, &[1.0], 2).is_err());
    }
}
