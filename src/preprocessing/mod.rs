//! Preprocessing transformers and table-level transforms.
//!
//! The pipeline's preprocessing is deliberately stateless across calls:
//! `standardize` refits its scaler on whatever slice it is handed (a cluster
//! subset, a train split, a test split) every time it runs. Nothing here
//! persists fitted parameters between training and prediction; both sides
//! recompute on their own data. Changing that would change numeric outputs.

use crate::data::DataFrame;
use crate::error::{FraguarError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Standardizes features by removing mean and scaling to unit variance.
///
/// The standard score of a sample x is: z = (x - mean) / std, with mean and
/// std computed per column during `fit`. A column with (near-)zero standard
/// deviation is centered but not scaled, so constant columns map to 0.0
/// rather than NaN.
///
/// # Examples
///
/// ```
/// use fraguar::prelude::*;
/// use fraguar::preprocessing::StandardScaler;
///
/// let data = Matrix::from_vec(3, 2, vec![
///     0.0, 0.0,
///     1.0, 10.0,
///     2.0, 20.0,
/// ]).expect("valid matrix dimensions");
///
/// let mut scaler = StandardScaler::new();
/// let scaled = scaler.fit_transform(&data).expect("fit_transform should succeed");
/// assert!(scaled.column(0).mean().abs() < 1e-5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Mean of each feature (computed during fit).
    mean: Option<Vec<f32>>,
    /// Standard deviation of each feature (computed during fit).
    std: Option<Vec<f32>>,
}

impl StandardScaler {
    /// Creates a new `StandardScaler`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
        }
    }

    /// Returns true if the scaler has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

impl Transformer for StandardScaler {
    /// Computes the mean and standard deviation of each feature.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();

        if n_samples == 0 {
            return Err("Cannot fit with zero samples".into());
        }

        let mut mean = vec![0.0; n_features];
        for (j, mean_j) in mean.iter_mut().enumerate() {
            let mut sum = 0.0;
            for i in 0..n_samples {
                sum += x.get(i, j);
            }
            *mean_j = sum / n_samples as f32;
        }

        // Population std (divide by n, not n-1).
        let mut std = vec![0.0; n_features];
        for (j, std_j) in std.iter_mut().enumerate() {
            let mut sum_sq = 0.0;
            for i in 0..n_samples {
                let diff = x.get(i, j) - mean[j];
                sum_sq += diff * diff;
            }
            *std_j = (sum_sq / n_samples as f32).sqrt();
        }

        self.mean = Some(mean);
        self.std = Some(std);

        Ok(())
    }

    /// Standardizes the data using fitted mean and std.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| FraguarError::from("Scaler not fitted"))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| FraguarError::from("Scaler not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(FraguarError::DimensionMismatch {
                expected: format!("{} features", mean.len()),
                actual: format!("{n_features} features"),
            });
        }

        let mut result = vec![0.0; n_samples * n_features];

        for i in 0..n_samples {
            for j in 0..n_features {
                let mut val = x.get(i, j) - mean[j];
                if std[j] > 1e-10 {
                    val /= std[j];
                }
                result[i * n_features + j] = val;
            }
        }

        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

/// Fills missing values (NaN) using k-nearest-neighbor imputation.
///
/// Distances between rows are averaged squared differences over the columns
/// both rows have observed. A missing entry becomes the mean of that column
/// across the k nearest rows that observed it; a row with no comparable
/// neighbor falls back to the column mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl KnnImputer {
    /// Creates an imputer using `n_neighbors` nearest rows.
    #[must_use]
    pub fn new(n_neighbors: usize) -> Self {
        Self { n_neighbors }
    }

    /// Mean of the observed values in column `j`.
    fn column_mean(x: &Matrix<f32>, j: usize) -> Result<f32> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..x.n_rows() {
            let v = x.get(i, j);
            if !v.is_nan() {
                sum += v;
                count += 1;
            }
        }
        if count == 0 {
            return Err(FraguarError::Other(format!(
                "column {j} has no observed values to impute from"
            )));
        }
        Ok(sum / count as f32)
    }

    /// Mean squared distance over columns observed in both rows.
    fn row_distance(x: &Matrix<f32>, a: usize, b: usize) -> Option<f32> {
        let mut sum = 0.0;
        let mut shared = 0usize;
        for c in 0..x.n_cols() {
            let va = x.get(a, c);
            let vb = x.get(b, c);
            if !va.is_nan() && !vb.is_nan() {
                let diff = va - vb;
                sum += diff * diff;
                shared += 1;
            }
        }
        (shared > 0).then(|| sum / shared as f32)
    }
}

impl Transformer for KnnImputer {
    fn fit(&mut self, _x: &Matrix<f32>) -> Result<()> {
        if self.n_neighbors == 0 {
            return Err(FraguarError::InvalidHyperparameter {
                param: "n_neighbors".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }
        Ok(())
    }

    /// Imputes missing entries within `x` itself.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let (n_rows, n_cols) = x.shape();
        let mut result = x.clone();

        for j in 0..n_cols {
            let has_missing = (0..n_rows).any(|i| x.get(i, j).is_nan());
            if !has_missing {
                continue;
            }
            let fallback = Self::column_mean(x, j)?;

            for i in 0..n_rows {
                if !x.get(i, j).is_nan() {
                    continue;
                }

                // Candidate donors: rows with column j observed, ranked by
                // distance then row index for determinism.
                let mut candidates: Vec<(f32, usize)> = (0..n_rows)
                    .filter(|&r| r != i && !x.get(r, j).is_nan())
                    .filter_map(|r| Self::row_distance(x, i, r).map(|d| (d, r)))
                    .collect();
                candidates.sort_by(|a, b| {
                    a.0.partial_cmp(&b.0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.1.cmp(&b.1))
                });

                let value = if candidates.is_empty() {
                    fallback
                } else {
                    let k = self.n_neighbors.min(candidates.len());
                    candidates[..k]
                        .iter()
                        .map(|&(_, r)| x.get(r, j))
                        .sum::<f32>()
                        / k as f32
                };
                result.set(i, j, value);
            }
        }

        Ok(result)
    }
}

/// Reports whether any listed column contains missing values, and which.
///
/// A non-empty column list always means "nulls present".
#[must_use]
pub fn detect_nulls(df: &DataFrame) -> (bool, Vec<String>) {
    let null_columns: Vec<String> = df
        .iter_columns()
        .filter(|(_, col)| col.as_slice().iter().any(|v| v.is_nan()))
        .map(|(name, _)| name.to_string())
        .collect();

    (!null_columns.is_empty(), null_columns)
}

/// Checks that `numeric_cols` is non-empty and every name exists in `df`.
fn validate_numeric_cols(df: &DataFrame, numeric_cols: &[String]) -> Result<()> {
    if numeric_cols.is_empty() {
        return Err(FraguarError::empty_input("numeric columns"));
    }
    for name in numeric_cols {
        if !df.has_column(name) {
            return Err(FraguarError::Other(format!(
                "numeric column '{name}' not present in table"
            )));
        }
    }
    Ok(())
}

/// Rebuilds `df` with the listed columns replaced by the matrix columns,
/// leaving every other column untouched.
fn replace_columns(df: &DataFrame, names: &[String], values: &Matrix<f32>) -> Result<DataFrame> {
    let columns = df
        .iter_columns()
        .map(|(name, col)| {
            let replaced = names.iter().position(|n| n == name);
            let data = match replaced {
                Some(j) => values.column(j),
                None => col.clone(),
            };
            (name.to_string(), data)
        })
        .collect();
    DataFrame::new(columns)
}

/// Imputes missing values in the listed numeric columns using KNN.
///
/// # Errors
///
/// Returns an error if the column list is empty, a column is absent, or a
/// listed column has no observed values at all.
pub fn impute_missing(
    df: &DataFrame,
    numeric_cols: &[String],
    n_neighbors: usize,
) -> Result<DataFrame> {
    validate_numeric_cols(df, numeric_cols)?;

    let names: Vec<&str> = numeric_cols.iter().map(String::as_str).collect();
    let subset = df.select(&names)?.to_matrix();

    let mut imputer = KnnImputer::new(n_neighbors);
    let imputed = imputer.fit_transform(&subset)?;

    replace_columns(df, numeric_cols, &imputed)
}

/// Replaces each value v in the listed columns with ln(v + 1).
///
/// Values at or below -1 are not rejected here; they surface as NaN or
/// negative infinity in the transformed table.
///
/// # Errors
///
/// Returns an error if the column list is empty or a column is absent.
pub fn log_transform(df: &DataFrame, numeric_cols: &[String]) -> Result<DataFrame> {
    validate_numeric_cols(df, numeric_cols)?;

    let columns = df
        .iter_columns()
        .map(|(name, col)| {
            let data = if numeric_cols.iter().any(|n| n == name) {
                Vector::from_vec(col.as_slice().iter().map(|&v| (v + 1.0).ln()).collect())
            } else {
                col.clone()
            };
            (name.to_string(), data)
        })
        .collect();
    DataFrame::new(columns)
}

/// Z-score standardizes the listed columns, refitting on this table alone.
///
/// Every call recomputes mean and std from the slice it receives; there is
/// no fitted scaler carried between calls.
///
/// # Errors
///
/// Returns an error if the column list is empty or a column is absent.
pub fn standardize(df: &DataFrame, numeric_cols: &[String]) -> Result<DataFrame> {
    validate_numeric_cols(df, numeric_cols)?;

    let names: Vec<&str> = numeric_cols.iter().map(String::as_str).collect();
    let subset = df.select(&names)?.to_matrix();

    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(&subset)?;

    replace_columns(df, numeric_cols, &scaled)
}

/// Splits a table into a feature frame and a label vector.
///
/// # Errors
///
/// Returns an error if the label column is absent or is the only column.
pub fn split_features_label(df: &DataFrame, label_column: &str) -> Result<(DataFrame, Vector<f32>)> {
    let label = df.column(label_column)?.clone();
    let mut features = df.clone();
    features.drop_column(label_column)?;
    Ok((features, label))
}
