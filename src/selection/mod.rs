//! Competitive model search per cluster.
//!
//! Two phases. The comparison pass fits every candidate algorithm with
//! default hyperparameters and ranks them by held-out R²; ties keep the
//! earlier candidate in the fixed ordering. The refinement pass runs an
//! exhaustive grid search with 5-fold cross-validation (scored by negative
//! MSE) over the winner's grid, refits the best configuration on the full
//! training split, and records one tracked run with the hyperparameters,
//! the cross-validation score, and the final held-out R². Algorithms with
//! an empty grid keep their comparison-pass fit.

use crate::error::Result;
use crate::linear_model::LinearRegression;
use crate::model_selection::{cross_validate, KFold, Scoring};
use crate::primitives::{Matrix, Vector};
use crate::registry::{RunTracker, MODEL_NAME_TAG};
use crate::svm::LinearSvr;
use crate::traits::Estimator;
use crate::tree::{GradientBoostingRegressor, RandomForestRegressor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Prefix of the tag that marks each cluster's production model.
pub const PRODUCTION_MODEL_PREFIX: &str = "prediction_model_";

/// Tag value for a cluster's production model.
#[must_use]
pub fn production_model_tag(cluster_id: usize) -> String {
    format!("{PRODUCTION_MODEL_PREFIX}{cluster_id}")
}

/// The candidate regression algorithms, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegressorKind {
    /// Ordinary least squares.
    Linear,
    /// Bootstrap-averaged regression trees.
    RandomForest,
    /// Squared-error boosted trees.
    GradientBoosting,
    /// Linear epsilon-insensitive support vector regression.
    Svr,
}

impl RegressorKind {
    /// Every candidate, in the order ties are broken.
    pub const ALL: [RegressorKind; 4] = [
        RegressorKind::Linear,
        RegressorKind::RandomForest,
        RegressorKind::GradientBoosting,
        RegressorKind::Svr,
    ];

    /// Stable name used in run records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RegressorKind::Linear => "linear_regression",
            RegressorKind::RandomForest => "random_forest",
            RegressorKind::GradientBoosting => "gradient_boosting",
            RegressorKind::Svr => "svr",
        }
    }

    /// The candidate with default hyperparameters.
    fn default_model(self, random_state: u64) -> CandidateModel {
        match self {
            RegressorKind::Linear => CandidateModel::Linear(LinearRegression::new()),
            RegressorKind::RandomForest => CandidateModel::RandomForest(
                RandomForestRegressor::new(100).with_random_state(random_state),
            ),
            RegressorKind::GradientBoosting => {
                CandidateModel::GradientBoosting(GradientBoostingRegressor::new())
            }
            RegressorKind::Svr => CandidateModel::Svr(LinearSvr::new()),
        }
    }

    /// The exhaustive hyperparameter grid for this algorithm. Empty for
    /// algorithms that skip refinement.
    fn grid(self, random_state: u64) -> Vec<GridPoint> {
        match self {
            RegressorKind::Linear => Vec::new(),
            RegressorKind::RandomForest => {
                let mut points = Vec::new();
                for &n_estimators in &[50usize, 100, 150] {
                    for &max_depth in &[None, Some(10usize), Some(20)] {
                        for &min_samples_split in &[2usize, 5, 10] {
                            let mut model = RandomForestRegressor::new(n_estimators)
                                .with_min_samples_split(min_samples_split)
                                .with_random_state(random_state);
                            if let Some(depth) = max_depth {
                                model = model.with_max_depth(depth);
                            }
                            points.push(GridPoint {
                                params: vec![
                                    ("n_estimators", n_estimators.to_string()),
                                    (
                                        "max_depth",
                                        max_depth.map_or_else(|| "none".to_string(), |d| d.to_string()),
                                    ),
                                    ("min_samples_split", min_samples_split.to_string()),
                                ],
                                model: CandidateModel::RandomForest(model),
                            });
                        }
                    }
                }
                points
            }
            RegressorKind::GradientBoosting => {
                let mut points = Vec::new();
                for &n_estimators in &[50usize, 100] {
                    for &learning_rate in &[0.05f32, 0.01, 0.001] {
                        for &max_depth in &[3usize, 5, 10] {
                            let model = GradientBoostingRegressor::new()
                                .with_n_estimators(n_estimators)
                                .with_learning_rate(learning_rate)
                                .with_max_depth(max_depth);
                            points.push(GridPoint {
                                params: vec![
                                    ("n_estimators", n_estimators.to_string()),
                                    ("learning_rate", learning_rate.to_string()),
                                    ("max_depth", max_depth.to_string()),
                                ],
                                model: CandidateModel::GradientBoosting(model),
                            });
                        }
                    }
                }
                points
            }
            RegressorKind::Svr => {
                let mut points = Vec::new();
                for &c in &[1.0f32, 10.0, 100.0] {
                    for &epsilon in &[0.1f32, 0.01, 0.001] {
                        let model = LinearSvr::new().with_c(c).with_epsilon(epsilon);
                        points.push(GridPoint {
                            params: vec![
                                ("c", c.to_string()),
                                ("epsilon", epsilon.to_string()),
                            ],
                            model: CandidateModel::Svr(model),
                        });
                    }
                }
                points
            }
        }
    }
}

/// One configuration in a hyperparameter grid.
#[derive(Debug, Clone)]
struct GridPoint {
    params: Vec<(&'static str, String)>,
    model: CandidateModel,
}

/// A fitted candidate, dispatched by variant rather than by name strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateModel {
    /// See [`RegressorKind::Linear`].
    Linear(LinearRegression),
    /// See [`RegressorKind::RandomForest`].
    RandomForest(RandomForestRegressor),
    /// See [`RegressorKind::GradientBoosting`].
    GradientBoosting(GradientBoostingRegressor),
    /// See [`RegressorKind::Svr`].
    Svr(LinearSvr),
}

impl CandidateModel {
    /// The algorithm this model is an instance of.
    #[must_use]
    pub fn kind(&self) -> RegressorKind {
        match self {
            CandidateModel::Linear(_) => RegressorKind::Linear,
            CandidateModel::RandomForest(_) => RegressorKind::RandomForest,
            CandidateModel::GradientBoosting(_) => RegressorKind::GradientBoosting,
            CandidateModel::Svr(_) => RegressorKind::Svr,
        }
    }
}

impl Estimator for CandidateModel {
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        match self {
            CandidateModel::Linear(m) => m.fit(x, y),
            CandidateModel::RandomForest(m) => m.fit(x, y),
            CandidateModel::GradientBoosting(m) => m.fit(x, y),
            CandidateModel::Svr(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
        match self {
            CandidateModel::Linear(m) => m.predict(x),
            CandidateModel::RandomForest(m) => m.predict(x),
            CandidateModel::GradientBoosting(m) => m.predict(x),
            CandidateModel::Svr(m) => m.predict(x),
        }
    }

    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        match self {
            CandidateModel::Linear(m) => m.score(x, y),
            CandidateModel::RandomForest(m) => m.score(x, y),
            CandidateModel::GradientBoosting(m) => m.score(x, y),
            CandidateModel::Svr(m) => m.score(x, y),
        }
    }
}

/// Result of the refinement pass for one cluster.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Winning algorithm.
    pub kind: RegressorKind,
    /// Final fitted model (grid winner, or the comparison-pass fit when the
    /// grid is empty).
    pub model: CandidateModel,
    /// Mean cross-validation score of the grid winner (negative MSE), if a
    /// grid search ran.
    pub cv_score: Option<f32>,
    /// R² on the held-out test split after refinement.
    pub test_r2: f32,
}

/// Per-cluster two-phase model search.
#[derive(Debug, Clone)]
pub struct ModelFinder {
    random_state: u64,
    cv_folds: usize,
}

impl ModelFinder {
    /// Creates a finder whose randomized components derive from
    /// `random_state`.
    #[must_use]
    pub fn new(random_state: u64) -> Self {
        Self {
            random_state,
            cv_folds: 5,
        }
    }

    /// Comparison pass: fits every candidate with defaults and returns the
    /// one with the highest held-out R². Ties keep the earlier candidate.
    ///
    /// # Errors
    ///
    /// Any candidate's fit failure aborts the whole selection; there is no
    /// skip-and-continue.
    pub fn select(
        &self,
        x_train: &Matrix<f32>,
        y_train: &Vector<f32>,
        x_test: &Matrix<f32>,
        y_test: &Vector<f32>,
    ) -> Result<(RegressorKind, CandidateModel)> {
        let mut best: Option<(RegressorKind, CandidateModel, f32)> = None;

        for kind in RegressorKind::ALL {
            let mut model = kind.default_model(self.random_state);
            model.fit(x_train, y_train)?;
            let score = model.score(x_test, y_test);

            let improves = best.as_ref().map_or(true, |(_, _, s)| score > *s);
            if improves {
                best = Some((kind, model, score));
            }
        }

        let (kind, model, _) = best.expect("candidate set is never empty");
        Ok((kind, model))
    }

    /// Refinement pass: grid search over the winner's hyperparameters,
    /// refit of the best configuration, final held-out evaluation, and one
    /// tracked run tagged for the prediction path.
    ///
    /// # Errors
    ///
    /// Returns an error if any grid fit, the final refit, or persistence
    /// fails.
    pub fn refine(
        &self,
        kind: RegressorKind,
        model: CandidateModel,
        x_train: &Matrix<f32>,
        y_train: &Vector<f32>,
        x_test: &Matrix<f32>,
        y_test: &Vector<f32>,
        cluster_id: usize,
        tracker: &RunTracker,
    ) -> Result<Refinement> {
        let grid = kind.grid(self.random_state);

        let (refined, winning_params, cv_score) = if grid.is_empty() {
            (model, Vec::new(), None)
        } else {
            let kfold = KFold::new(self.cv_folds).with_random_state(self.random_state);

            let scores: Vec<f32> = grid
                .par_iter()
                .map(|point| {
                    cross_validate(
                        &point.model,
                        x_train,
                        y_train,
                        &kfold,
                        Scoring::NegMeanSquaredError,
                    )
                    .map(|result| result.mean())
                })
                .collect::<Result<_>>()?;

            // First-encountered wins on ties, matching the comparison pass.
            let mut best_idx = 0;
            for (idx, &score) in scores.iter().enumerate() {
                if score > scores[best_idx] {
                    best_idx = idx;
                }
            }

            let chosen = grid.into_iter().nth(best_idx).expect("index within grid");
            let mut refined = chosen.model;
            refined.fit(x_train, y_train)?;
            (refined, chosen.params, Some(scores[best_idx]))
        };

        let test_r2 = refined.score(x_test, y_test);

        let tag = production_model_tag(cluster_id);
        let mut run = tracker.start_run()?;
        run.log_params(
            std::iter::once(("model".to_string(), kind.as_str().to_string())).chain(
                winning_params
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone())),
            ),
        );
        run.log_metrics([("r2_score".to_string(), test_r2)]);
        if let Some(cv) = cv_score {
            run.log_metrics([("neg_mean_squared_error".to_string(), cv)]);
        }
        run.set_tag(MODEL_NAME_TAG, &tag);
        tracker.log_run(&run)?;
        tracker.save_artifact(&refined, &tag)?;

        Ok(Refinement {
            kind,
            model: refined,
            cv_score,
            test_r2,
        })
    }
}
