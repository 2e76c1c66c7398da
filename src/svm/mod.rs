//! Support vector regression.
//!
//! A linear epsilon-insensitive SVR trained by full-batch subgradient
//! descent. Residuals inside the epsilon tube contribute no loss; the
//! regularization strength is controlled by `c` (larger `c`, weaker
//! shrinkage), matching the usual SVR parameterization.

use crate::error::{FraguarError, Result};
use crate::metrics::r_squared;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};

/// Linear epsilon-insensitive support vector regressor.
///
/// # Examples
///
/// ```
/// use fraguar::prelude::*;
/// use fraguar::svm::LinearSvr;
///
/// let x = Matrix::from_vec(5, 1, vec![-2.0, -1.0, 0.0, 1.0, 2.0]).unwrap();
/// let y = Vector::from_slice(&[-4.0, -2.0, 0.0, 2.0, 4.0]);
///
/// let mut model = LinearSvr::new();
/// model.fit(&x, &y).unwrap();
/// assert!(model.score(&x, &y) > 0.9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvr {
    /// Inverse regularization strength.
    c: f32,
    /// Half-width of the zero-loss tube around the target.
    epsilon: f32,
    /// Step size for subgradient descent.
    learning_rate: f32,
    /// Maximum training epochs.
    max_iter: usize,
    /// Convergence tolerance on the weight update.
    tol: f32,
    /// Learned weights.
    weights: Option<Vector<f32>>,
    /// Learned bias.
    bias: f32,
}

impl Default for LinearSvr {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSvr {
    /// Creates a new `LinearSvr` with default hyperparameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            learning_rate: 0.1,
            max_iter: 1000,
            tol: 1e-6,
            weights: None,
            bias: 0.0,
        }
    }

    /// Sets the inverse regularization strength.
    #[must_use]
    pub fn with_c(mut self, c: f32) -> Self {
        self.c = c;
        self
    }

    /// Sets the epsilon tube half-width.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the subgradient step size.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets the maximum number of epochs.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    fn validate_hyperparameters(&self) -> Result<()> {
        if self.c <= 0.0 {
            return Err(FraguarError::InvalidHyperparameter {
                param: "c".to_string(),
                value: format!("{}", self.c),
                constraint: "> 0".to_string(),
            });
        }
        if self.epsilon < 0.0 {
            return Err(FraguarError::InvalidHyperparameter {
                param: "epsilon".to_string(),
                value: format!("{}", self.epsilon),
                constraint: ">= 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Estimator for LinearSvr {
    /// Trains by minimizing `||w||² / (2·c·n) + mean epsilon-insensitive
    /// loss` with full-batch subgradient descent.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid hyperparameters or mismatched inputs.
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        self.validate_hyperparameters()?;

        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }
        if n_samples != y.len() {
            return Err("Number of samples must match target length".into());
        }

        let n = n_samples as f32;
        let mut weights = vec![0.0f32; n_features];
        let mut bias = 0.0f32;

        for _ in 0..self.max_iter {
            let mut grad_w = vec![0.0f32; n_features];
            let mut grad_b = 0.0f32;

            for i in 0..n_samples {
                let mut pred = bias;
                for j in 0..n_features {
                    pred += weights[j] * x.get(i, j);
                }
                let residual = pred - y[i];
                if residual.abs() <= self.epsilon {
                    continue;
                }
                let sign = residual.signum();
                for (j, g) in grad_w.iter_mut().enumerate() {
                    *g += sign * x.get(i, j);
                }
                grad_b += sign;
            }

            let mut max_update = 0.0f32;
            for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                let step = self.learning_rate * (*w / (self.c * n) + g / n);
                *w -= step;
                max_update = max_update.max(step.abs());
            }
            let bias_step = self.learning_rate * grad_b / n;
            bias -= bias_step;
            max_update = max_update.max(bias_step.abs());

            if max_update < self.tol {
                break;
            }
        }

        self.weights = Some(Vector::from_vec(weights));
        self.bias = bias;
        Ok(())
    }

    /// Predicts target values for input data.
    ///
    /// # Panics
    ///
    /// Panics if model is not fitted.
    fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
        let weights = self
            .weights
            .as_ref()
            .expect("Model not fitted. Call fit() first.");

        let (n_samples, _) = x.shape();
        let mut predictions = Vec::with_capacity(n_samples);
        for i in 0..n_samples {
            predictions.push(x.row(i).dot(weights) + self.bias);
        }
        Vector::from_vec(predictions)
    }

    /// Computes the R² score on the given data.
    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        let predictions = self.predict(x);
        r_squared(&predictions, y)
    }
}
