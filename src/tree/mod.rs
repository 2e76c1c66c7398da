//! Tree-based regressors.
//!
//! CART regression trees with the two ensembles built on top of them:
//! bootstrap-averaged random forests and squared-error gradient boosting.

use crate::error::Result;
use crate::metrics::r_squared;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A node in a fitted regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum RegressionTreeNode {
    /// Terminal node predicting the mean of its training targets.
    Leaf { value: f32 },
    /// Internal split on `feature_idx <= threshold`.
    Split {
        feature_idx: usize,
        threshold: f32,
        left: Box<RegressionTreeNode>,
        right: Box<RegressionTreeNode>,
    },
}

/// Best split found for one node, if any.
struct SplitCandidate {
    feature_idx: usize,
    threshold: f32,
    cost: f32,
}

fn mean_of(y: &Vector<f32>, indices: &[usize]) -> f32 {
    indices.iter().map(|&i| y[i]).sum::<f32>() / indices.len() as f32
}

/// Scans every feature for the threshold minimizing the summed squared error
/// of the two children. Uses prefix sums over the sorted feature values so
/// each feature costs one sort plus a linear pass.
fn best_split(
    x: &Matrix<f32>,
    y: &Vector<f32>,
    indices: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    if n < 2 * min_samples_leaf.max(1) {
        return None;
    }
    let n_features = x.n_cols();
    let mut best: Option<SplitCandidate> = None;

    for feature_idx in 0..n_features {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            x.get(a, feature_idx)
                .partial_cmp(&x.get(b, feature_idx))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut prefix_sum = vec![0.0f64; n + 1];
        let mut prefix_sum_sq = vec![0.0f64; n + 1];
        for (pos, &idx) in order.iter().enumerate() {
            let v = f64::from(y[idx]);
            prefix_sum[pos + 1] = prefix_sum[pos] + v;
            prefix_sum_sq[pos + 1] = prefix_sum_sq[pos] + v * v;
        }
        let total_sum = prefix_sum[n];
        let total_sum_sq = prefix_sum_sq[n];

        for p in min_samples_leaf..=(n - min_samples_leaf) {
            if p == 0 || p == n {
                continue;
            }
            let lo = x.get(order[p - 1], feature_idx);
            let hi = x.get(order[p], feature_idx);
            if lo == hi {
                continue;
            }

            let left_sum = prefix_sum[p];
            let left_sq = prefix_sum_sq[p];
            let right_sum = total_sum - left_sum;
            let right_sq = total_sum_sq - left_sq;

            let left_sse = left_sq - left_sum * left_sum / p as f64;
            let right_sse = right_sq - right_sum * right_sum / (n - p) as f64;
            let cost = (left_sse + right_sse) as f32;

            if best.as_ref().map_or(true, |b| cost < b.cost) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: (lo + hi) / 2.0,
                    cost,
                });
            }
        }
    }

    best
}

fn build_regression_tree(
    x: &Matrix<f32>,
    y: &Vector<f32>,
    indices: &[usize],
    depth: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
) -> RegressionTreeNode {
    let node_mean = mean_of(y, indices);

    let depth_reached = max_depth.is_some_and(|limit| depth >= limit);
    if depth_reached || indices.len() < min_samples_split {
        return RegressionTreeNode::Leaf { value: node_mean };
    }

    let Some(split) = best_split(x, y, indices, min_samples_leaf) else {
        return RegressionTreeNode::Leaf { value: node_mean };
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x.get(i, split.feature_idx) <= split.threshold);

    if left_idx.is_empty() || right_idx.is_empty() {
        return RegressionTreeNode::Leaf { value: node_mean };
    }

    RegressionTreeNode::Split {
        feature_idx: split.feature_idx,
        threshold: split.threshold,
        left: Box::new(build_regression_tree(
            x,
            y,
            &left_idx,
            depth + 1,
            max_depth,
            min_samples_split,
            min_samples_leaf,
        )),
        right: Box::new(build_regression_tree(
            x,
            y,
            &right_idx,
            depth + 1,
            max_depth,
            min_samples_split,
            min_samples_leaf,
        )),
    }
}

/// Decision tree regressor using the CART algorithm.
///
/// Splitting minimizes the summed squared error of the children; leaf nodes
/// predict the mean of their training targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    tree: Option<RegressionTreeNode>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    /// Creates a new decision tree regressor with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the minimum number of samples required to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets the minimum number of samples required at a leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    fn predict_one(&self, x: &Matrix<f32>, row: usize) -> f32 {
        let mut node = self.tree.as_ref().expect("Model not fitted. Call fit() first.");
        loop {
            match node {
                RegressionTreeNode::Leaf { value } => return *value,
                RegressionTreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x.get(row, *feature_idx) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

impl Estimator for DecisionTreeRegressor {
    /// Fits the tree to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty or dimensions don't match.
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        let (n_rows, _) = x.shape();
        if n_rows != y.len() {
            return Err("Number of samples in X and y must match".into());
        }
        if n_rows == 0 {
            return Err("Cannot fit with zero samples".into());
        }

        let indices: Vec<usize> = (0..n_rows).collect();
        self.tree = Some(build_regression_tree(
            x,
            y,
            &indices,
            0,
            self.max_depth,
            self.min_samples_split,
            self.min_samples_leaf,
        ));
        Ok(())
    }

    /// Predicts target values for samples.
    ///
    /// # Panics
    ///
    /// Panics if called before `fit`.
    fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
        let predictions = (0..x.n_rows()).map(|i| self.predict_one(x, i)).collect();
        Vector::from_vec(predictions)
    }

    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        let predictions = self.predict(x);
        r_squared(&predictions, y)
    }
}

/// Random forest regressor.
///
/// Ensemble of regression trees trained on bootstrap samples; predictions
/// are averaged across trees. Bootstrap draws are seeded per tree so a fixed
/// `random_state` reproduces the forest exactly.
///
/// # Examples
///
/// ```
/// use fraguar::prelude::*;
/// use fraguar::tree::RandomForestRegressor;
///
/// let x = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// let y = Vector::from_slice(&[2.0, 4.0, 6.0, 8.0, 10.0]);
///
/// let mut rf = RandomForestRegressor::new(10).with_random_state(42);
/// rf.fit(&x, &y).unwrap();
/// assert_eq!(rf.predict(&x).len(), 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    random_state: Option<u64>,
}

impl RandomForestRegressor {
    /// Creates a forest of `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            random_state: None,
        }
    }

    /// Sets the maximum depth of each tree.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the minimum number of samples required to split a node.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Sets the random seed for bootstrap sampling.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Returns the number of fitted trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Estimator for RandomForestRegressor {
    /// Fits every tree on its own bootstrap sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty, dimensions don't match, or
    /// `n_estimators` is zero.
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        let (n_rows, _) = x.shape();
        if n_rows != y.len() {
            return Err("Number of samples in X and y must match".into());
        }
        if n_rows == 0 {
            return Err("Cannot fit with zero samples".into());
        }
        if self.n_estimators == 0 {
            return Err("Forest must have at least one tree".into());
        }

        let base_seed = self.random_state.unwrap_or(0);
        let mut trees = Vec::with_capacity(self.n_estimators);

        for t in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(t as u64));
            let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();

            let x_boot = x.take_rows(&sample);
            let y_boot = y.take(&sample);

            let mut tree = DecisionTreeRegressor::new()
                .with_min_samples_split(self.min_samples_split);
            if let Some(depth) = self.max_depth {
                tree = tree.with_max_depth(depth);
            }
            tree.fit(&x_boot, &y_boot)?;
            trees.push(tree);
        }

        self.trees = trees;
        Ok(())
    }

    /// Predicts by averaging all trees.
    ///
    /// # Panics
    ///
    /// Panics if called before `fit`.
    fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
        assert!(!self.trees.is_empty(), "Model not fitted. Call fit() first.");

        let n_rows = x.n_rows();
        let mut sums = vec![0.0f32; n_rows];
        for tree in &self.trees {
            let preds = tree.predict(x);
            for (sum, &p) in sums.iter_mut().zip(preds.as_slice()) {
                *sum += p;
            }
        }
        let n_trees = self.trees.len() as f32;
        Vector::from_vec(sums.into_iter().map(|s| s / n_trees).collect())
    }

    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        let predictions = self.predict(x);
        r_squared(&predictions, y)
    }
}

/// Gradient boosting regressor with squared-error loss.
///
/// Starts from the target mean and adds shallow trees fitted to the current
/// residuals, each damped by the learning rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    trees: Vec<DecisionTreeRegressor>,
    init_value: f32,
    n_estimators: usize,
    learning_rate: f32,
    max_depth: usize,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientBoostingRegressor {
    /// Creates a booster with 100 depth-3 trees and learning rate 0.1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: Vec::new(),
            init_value: 0.0,
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }

    /// Sets the number of boosting stages.
    #[must_use]
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Sets the shrinkage applied to each stage.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the depth of each stage's tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns the number of fitted stages.
    #[must_use]
    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }
}

impl Estimator for GradientBoostingRegressor {
    /// Fits the boosting ensemble stage by stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty or dimensions don't match.
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        let (n_rows, _) = x.shape();
        if n_rows != y.len() {
            return Err("Number of samples in X and y must match".into());
        }
        if n_rows == 0 {
            return Err("Cannot fit with zero samples".into());
        }

        self.init_value = y.mean();
        let mut current: Vec<f32> = vec![self.init_value; n_rows];
        let mut trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let residuals =
                Vector::from_vec(y.as_slice().iter().zip(&current).map(|(t, c)| t - c).collect());

            let mut tree = DecisionTreeRegressor::new().with_max_depth(self.max_depth);
            tree.fit(x, &residuals)?;

            let correction = tree.predict(x);
            for (c, &delta) in current.iter_mut().zip(correction.as_slice()) {
                *c += self.learning_rate * delta;
            }
            trees.push(tree);
        }

        self.trees = trees;
        Ok(())
    }

    /// Predicts by summing the damped stage outputs over the initial value.
    ///
    /// # Panics
    ///
    /// Panics if called before `fit`.
    fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
        assert!(!self.trees.is_empty(), "Model not fitted. Call fit() first.");

        let n_rows = x.n_rows();
        let mut predictions = vec![self.init_value; n_rows];
        for tree in &self.trees {
            let stage = tree.predict(x);
            for (p, &delta) in predictions.iter_mut().zip(stage.as_slice()) {
                *p += self.learning_rate * delta;
            }
        }
        Vector::from_vec(predictions)
    }

    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        let predictions = self.predict(x);
        r_squared(&predictions, y)
    }
}
