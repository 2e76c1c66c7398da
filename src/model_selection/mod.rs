//! Model selection utilities: train/test splitting and k-fold
//! cross-validation.

use crate::error::{FraguarError, Result};
use crate::metrics::mse;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Score used to rank models during cross-validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// Coefficient of determination; higher is better.
    RSquared,
    /// Negative mean squared error; higher is better.
    NegMeanSquaredError,
}

/// Results from cross-validation.
#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    /// Score for each fold.
    pub scores: Vec<f32>,
}

impl CrossValidationResult {
    /// Mean score across folds.
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f32>() / self.scores.len() as f32
    }

    /// Standard deviation of the fold scores.
    #[must_use]
    pub fn std(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .scores
            .iter()
            .map(|&score| (score - mean).powi(2))
            .sum::<f32>()
            / self.scores.len() as f32;
        variance.sqrt()
    }
}

/// K-Fold cross-validator.
///
/// Splits data into K consecutive folds (shuffled when a random state is
/// set). Each fold is used once as the test set while the remaining K-1
/// folds form the training set.
///
/// # Examples
///
/// ```
/// use fraguar::model_selection::KFold;
///
/// let kfold = KFold::new(5).with_random_state(42);
/// let splits = kfold.split(10);
/// assert_eq!(splits.len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    /// Creates a new K-Fold cross-validator with `n_splits` folds.
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    /// Enables shuffling before splitting into folds.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Sets the random state for reproducible shuffling (implies shuffle).
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    /// Returns the number of folds.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generates (train_indices, test_indices) for each fold.
    #[must_use]
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut indices: Vec<usize> = (0..n_samples).collect();

        if self.shuffle {
            if let Some(seed) = self.random_state {
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                indices.shuffle(&mut rng);
            } else {
                let mut rng = rand::thread_rng();
                indices.shuffle(&mut rng);
            }
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut result = Vec::with_capacity(self.n_splits);
        let mut start = 0;

        for i in 0..self.n_splits {
            let current_fold_size = if i < remainder {
                fold_size + 1
            } else {
                fold_size
            };

            let end = start + current_fold_size;
            let test_indices: Vec<usize> = indices[start..end].to_vec();

            let mut train_indices = Vec::with_capacity(n_samples - current_fold_size);
            train_indices.extend_from_slice(&indices[..start]);
            train_indices.extend_from_slice(&indices[end..]);

            result.push((train_indices, test_indices));
            start = end;
        }

        result
    }
}

/// Extracts the samples at `indices` from a feature matrix and target.
fn extract_samples(x: &Matrix<f32>, y: &Vector<f32>, indices: &[usize]) -> (Matrix<f32>, Vector<f32>) {
    (x.take_rows(indices), y.take(indices))
}

/// Runs cross-validation on an estimator, returning one score per fold.
///
/// The estimator is cloned and refit for every fold.
///
/// # Errors
///
/// Returns an error if the fold configuration is invalid or any fold's fit
/// fails.
pub fn cross_validate<E>(
    estimator: &E,
    x: &Matrix<f32>,
    y: &Vector<f32>,
    cv: &KFold,
    scoring: Scoring,
) -> Result<CrossValidationResult>
where
    E: Estimator + Clone,
{
    let n_samples = x.n_rows();
    if cv.n_splits < 2 || cv.n_splits > n_samples {
        return Err(FraguarError::InvalidHyperparameter {
            param: "n_splits".to_string(),
            value: format!("{}", cv.n_splits),
            constraint: format!("2..={n_samples} (number of samples)"),
        });
    }

    let splits = cv.split(n_samples);
    let mut scores = Vec::with_capacity(splits.len());

    for (train_idx, test_idx) in splits {
        let (x_train, y_train) = extract_samples(x, y, &train_idx);
        let (x_test, y_test) = extract_samples(x, y, &test_idx);

        let mut fold_model = estimator.clone();
        fold_model.fit(&x_train, &y_train)?;

        let score = match scoring {
            Scoring::RSquared => fold_model.score(&x_test, &y_test),
            Scoring::NegMeanSquaredError => {
                let predictions = fold_model.predict(&x_test);
                -mse(&predictions, &y_test)
            }
        };
        scores.push(score);
    }

    Ok(CrossValidationResult { scores })
}

/// Validates inputs and returns (n_train, n_test).
fn validate_split_inputs(n_samples: usize, test_size: f32) -> Result<(usize, usize)> {
    if test_size <= 0.0 || test_size >= 1.0 {
        return Err(FraguarError::InvalidHyperparameter {
            param: "test_size".to_string(),
            value: format!("{test_size}"),
            constraint: "between 0 and 1 exclusive".to_string(),
        });
    }

    let n_test = (n_samples as f32 * test_size).round() as usize;
    let n_train = n_samples - n_test;

    if n_test == 0 || n_train == 0 {
        return Err(FraguarError::Other(format!(
            "split would leave an empty set (n_train={n_train}, n_test={n_test})"
        )));
    }

    Ok((n_train, n_test))
}

/// Shuffles and partitions `0..n_samples` into (train, test) index sets.
///
/// # Errors
///
/// Returns an error if `test_size` is out of range or either side would be
/// empty.
pub fn split_indices(
    n_samples: usize,
    test_size: f32,
    random_state: Option<u64>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let (n_train, _) = validate_split_inputs(n_samples, test_size)?;

    let mut indices: Vec<usize> = (0..n_samples).collect();
    if let Some(seed) = random_state {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
    } else {
        let mut rng = rand::thread_rng();
        indices.shuffle(&mut rng);
    }

    let test = indices.split_off(n_train);
    Ok((indices, test))
}

/// Splits arrays into random train and test subsets.
///
/// # Errors
///
/// Returns an error if lengths mismatch or `test_size` is invalid.
///
/// # Examples
///
/// ```
/// use fraguar::model_selection::train_test_split;
/// use fraguar::primitives::{Matrix, Vector};
///
/// let x = Matrix::from_vec(10, 2, (0..20).map(|i| i as f32).collect()).unwrap();
/// let y = Vector::from_slice(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
///
/// let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.2, Some(42)).unwrap();
/// assert_eq!(x_train.shape().0, 8);
/// assert_eq!(x_test.shape().0, 2);
/// # let _ = (y_train, y_test);
/// ```
#[allow(clippy::type_complexity)]
pub fn train_test_split(
    x: &Matrix<f32>,
    y: &Vector<f32>,
    test_size: f32,
    random_state: Option<u64>,
) -> Result<(Matrix<f32>, Matrix<f32>, Vector<f32>, Vector<f32>)> {
    let n_samples = x.n_rows();
    if n_samples != y.len() {
        return Err(FraguarError::DimensionMismatch {
            expected: format!("{n_samples} targets"),
            actual: format!("{} targets", y.len()),
        });
    }

    let (train_idx, test_idx) = split_indices(n_samples, test_size, random_state)?;

    let (x_train, y_train) = extract_samples(x, y, &train_idx);
    let (x_test, y_test) = extract_samples(x, y, &test_idx);

    Ok((x_train, x_test, y_train, y_test))
}
