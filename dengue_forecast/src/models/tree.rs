//! CART regression tree

use super::{check_prediction_input, check_training_data, normalize, Regressor};
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Decision tree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for feature subsampling
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_split: 4,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
        }
    }
}

impl TreeConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be greater than zero".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 || self.min_samples_split < 2 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be >= 1 and min_samples_split >= 2".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "max_features must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree minimizing squared error
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    name: String,
    config: TreeConfig,
    root: Option<Node>,
    n_features: Option<usize>,
    /// Total squared-error reduction per feature
    raw_importances: Vec<f64>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self {
            name: "decision_tree".to_string(),
            config: TreeConfig::default(),
            root: None,
            n_features: None,
            raw_importances: Vec::new(),
        }
    }
}

impl DecisionTreeRegressor {
    /// Create a new decision tree
    pub fn new(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Depth of the fitted tree (0 when unfitted)
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, Node::depth)
    }

    /// Unnormalized squared-error reduction per feature
    pub(crate) fn raw_importances(&self) -> &[f64] {
        &self.raw_importances
    }

    /// Fit on a subset of rows; repeated indices act as sample weights
    pub(crate) fn fit_rows(&mut self, x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> Result<()> {
        if rows.is_empty() {
            return Err(ForecastError::ModelError(
                "Cannot fit a tree on zero rows".to_string(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.raw_importances = vec![0.0; x.ncols()];
        self.n_features = Some(x.ncols());
        let root = self.build(x, y, rows.to_vec(), 0, &mut rng);
        self.root = Some(root);
        Ok(())
    }

    pub(crate) fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.root.as_ref().map_or(0.0, |node| node.predict(row))
    }

    fn build(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
    ) -> Node {
        let n = rows.len();
        let value = rows.iter().map(|&r| y[r]).sum::<f64>() / n as f64;

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
        {
            return Node::Leaf { value };
        }

        let Some(best) = self.find_best_split(x, y, &rows, rng) else {
            return Node::Leaf { value };
        };

        self.raw_importances[best.feature] += best.gain;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| x[[r, best.feature]] <= best.threshold);

        let left = self.build(x, y, left_rows, depth + 1, rng);
        let right = self.build(x, y, right_rows, depth + 1, rng);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n = rows.len();
        let total: f64 = rows.iter().map(|&r| y[r]).sum();
        let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
        let parent_sse = total_sq - total * total / n as f64;
        if parent_sse <= 1e-12 {
            return None;
        }

        let mut features: Vec<usize> = (0..x.ncols()).collect();
        if let Some(max_features) = self.config.max_features {
            features.shuffle(rng);
            features.truncate(max_features.min(x.ncols()));
        }

        let min_leaf = self.config.min_samples_leaf;
        let mut best: Option<BestSplit> = None;

        for feature in features {
            let mut sorted = rows.to_vec();
            sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for i in 1..n {
                let prev = sorted[i - 1];
                left_sum += y[prev];
                left_sq += y[prev] * y[prev];

                if i < min_leaf || n - i < min_leaf {
                    continue;
                }
                let (a, b) = (x[[prev, feature]], x[[sorted[i], feature]]);
                if a == b {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse_left = left_sq - left_sum * left_sum / i as f64;
                let sse_right = right_sq - right_sum * right_sum / (n - i) as f64;
                let gain = parent_sse - (sse_left + sse_right);

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (a + b) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

impl Regressor for DecisionTreeRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let rows: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &rows)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.is_fitted().then(|| normalize(self.raw_importances.clone()))
    }

    fn unfitted(&self) -> Box<dyn Regressor> {
        Box::new(Self {
            name: self.name.clone(),
            config: self.config.clone(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_step_function_is_learned() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y: Array1<f64> = (0..20).map(|i| if i < 10 { 5.0 } else { 50.0 }).collect();

        let mut tree = DecisionTreeRegressor::new(TreeConfig::default()).unwrap();
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&array![[3.0, 1.0], [15.0, 1.0]]).unwrap();
        assert_eq!(pred[0], 5.0);
        assert_eq!(pred[1], 50.0);

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances, vec![1.0, 0.0]);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_unfitted_and_shape_errors() {
        let tree = DecisionTreeRegressor::new(TreeConfig::default()).unwrap();
        assert!(tree.predict(&array![[1.0]]).is_err());
        assert!(tree.feature_importances().is_none());

        let mut tree = tree;
        tree.fit(&array![[1.0], [2.0], [3.0], [4.0]], &array![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert!(tree.predict(&array![[1.0, 2.0]]).is_err());
        assert!(!tree.unfitted().is_fitted());
    }

    #[test]
    fn test_invalid_config() {
        let config = TreeConfig {
            max_depth: 0,
            ..Default::default()
        };
        assert!(DecisionTreeRegressor::new(config).is_err());
    }
}
