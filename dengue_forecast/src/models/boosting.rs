//! Least-squares gradient boosting over shallow regression trees

use super::tree::{DecisionTreeRegressor, TreeConfig};
use super::{check_prediction_input, check_training_data, normalize, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Number of boosting iterations (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each tree
    pub subsample: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            learning_rate: 0.05,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 0.8,
            seed: 42,
        }
    }
}

/// Gradient boosting regressor
#[derive(Debug, Clone)]
pub struct GradientBoostingRegressor {
    name: String,
    config: BoostingConfig,
    init: f64,
    trees: Vec<DecisionTreeRegressor>,
    n_features: Option<usize>,
    importances: Vec<f64>,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self {
            name: "gradient_boosting".to_string(),
            config: BoostingConfig::default(),
            init: 0.0,
            trees: Vec::new(),
            n_features: None,
            importances: Vec::new(),
        }
    }
}

impl GradientBoostingRegressor {
    /// Create a new gradient boosting regressor
    pub fn new(config: BoostingConfig) -> Result<Self> {
        if config.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be greater than zero".to_string(),
            ));
        }
        if !(config.learning_rate > 0.0 && config.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if !(config.subsample > 0.0 && config.subsample <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "subsample must be in (0, 1]".to_string(),
            ));
        }
        Self::tree_config(&config, 0).validate()?;

        Ok(Self {
            config,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    fn tree_config(config: &BoostingConfig, i: usize) -> TreeConfig {
        TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: None,
            seed: config.seed.wrapping_add(i as u64),
        }
    }
}

impl Regressor for GradientBoostingRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n = x.nrows();
        let sample_size = ((n as f64 * self.config.subsample).ceil() as usize).clamp(1, n);

        let init = y.mean().unwrap_or(0.0);
        let mut current = Array1::from_elem(n, init);
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut importances = vec![0.0; x.ncols()];
        let mut all_rows: Vec<usize> = (0..n).collect();

        for i in 0..self.config.n_estimators {
            let residuals = y - &current;

            let rows: &[usize] = if sample_size < n {
                all_rows.shuffle(&mut rng);
                &all_rows[..sample_size]
            } else {
                &all_rows
            };

            let mut tree = DecisionTreeRegressor::new(Self::tree_config(&self.config, i))?;
            tree.fit_rows(x, &residuals, rows)?;

            for (row, value) in x.rows().into_iter().zip(current.iter_mut()) {
                *value += self.config.learning_rate * tree.predict_row(row);
            }
            for (total, imp) in importances.iter_mut().zip(tree.raw_importances()) {
                *total += imp;
            }
            trees.push(tree);
        }

        let train_mse = (y - &current).mapv(|e| e * e).mean().unwrap_or(0.0);
        debug!(
            "Boosted {} trees on {} rows, training MSE {:.4}",
            trees.len(),
            n,
            train_mse
        );

        self.init = init;
        self.trees = trees;
        self.importances = normalize(importances);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.n_features)?;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.init
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.is_fitted().then(|| self.importances.clone())
    }

    fn unfitted(&self) -> Box<dyn Regressor> {
        Box::new(Self {
            name: self.name.clone(),
            config: self.config.clone(),
            ..Default::default()
        })
    }
}
