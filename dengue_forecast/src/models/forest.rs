//! Random forest of bootstrapped regression trees

use super::tree::{DecisionTreeRegressor, TreeConfig};
use super::{check_prediction_input, check_training_data, normalize, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Random forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (n_features / 3 if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 8,
            min_samples_split: 4,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Random forest regressor
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    name: String,
    config: ForestConfig,
    trees: Vec<DecisionTreeRegressor>,
    n_features: Option<usize>,
    importances: Vec<f64>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self {
            name: "random_forest".to_string(),
            config: ForestConfig::default(),
            trees: Vec::new(),
            n_features: None,
            importances: Vec::new(),
        }
    }
}

impl RandomForestRegressor {
    /// Create a new random forest
    pub fn new(config: ForestConfig) -> Result<Self> {
        if config.n_trees == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_trees must be greater than zero".to_string(),
            ));
        }
        Self::tree_config(&config, 1, 0).validate()?;

        Ok(Self {
            config,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_config(config: &ForestConfig, max_features: usize, i: usize) -> TreeConfig {
        TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: Some(max_features),
            seed: config.seed.wrapping_add(i as u64),
        }
    }
}

impl Regressor for RandomForestRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n = x.nrows();
        let n_features = x.ncols();
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (n_features / 3).max(1));

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_trees);
        let mut importances = vec![0.0; n_features];

        for i in 0..self.config.n_trees {
            let rows: Vec<usize> = if self.config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let mut tree = DecisionTreeRegressor::new(Self::tree_config(&self.config, max_features, i))?;
            tree.fit_rows(x, y, &rows)?;

            for (total, imp) in importances.iter_mut().zip(normalize(tree.raw_importances().to_vec())) {
                *total += imp;
            }
            trees.push(tree);
        }

        self.importances = normalize(importances);
        self.trees = trees;
        self.n_features = Some(n_features);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
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
