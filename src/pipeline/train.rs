//! The training orchestrator.
//!
//! Sequence: load exported table → null check and imputation → feature /
//! label split → log transform → cluster-count search → final cluster fit
//! (persisted once) → per-cluster model search, refinement, and
//! persistence. Any stage failure aborts the run. Persistence is
//! call-by-call: a failure in a later cluster does not roll back models
//! already saved for earlier clusters; the next successful run overwrites
//! them by key.

use crate::cluster::ClusterAssigner;
use crate::config::PipelineConfig;
use crate::data::DataFrame;
use crate::error::{FraguarError, Result};
use crate::logging::FileLogger;
use crate::model_selection::split_indices;
use crate::preprocessing;
use crate::registry::RunTracker;
use crate::selection::ModelFinder;

/// Outcome of one cluster's model search.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Cluster id the model is keyed by.
    pub cluster_id: usize,
    /// Name of the winning algorithm.
    pub algorithm: String,
    /// Mean cross-validation score of the grid winner, if a grid ran.
    pub cv_score: Option<f32>,
    /// Held-out R² of the persisted model.
    pub test_r2: f32,
}

/// Summary of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Number of clusters discovered by the elbow search.
    pub n_clusters: usize,
    /// Per-cluster outcomes, in first-seen cluster order.
    pub clusters: Vec<ClusterOutcome>,
}

/// Runs the full training sequence against a configuration.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    /// Creates a training pipeline for `config`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Executes the training run.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; the failure is also logged.
    pub fn run(&self) -> Result<TrainingReport> {
        let logger = FileLogger::create(&self.config.training_log_path)?;
        logger.log("training", "Started training the model");

        match self.run_stages(&logger) {
            Ok(report) => {
                logger.log("training", "Successful end of training");
                Ok(report)
            }
            Err(e) => {
                logger.log("training", &format!("Training failed: {e}"));
                Err(e)
            }
        }
    }

    fn run_stages(&self, logger: &FileLogger) -> Result<TrainingReport> {
        let data = DataFrame::read_csv(&self.config.training_data_path)?;
        logger.log(
            "training",
            &format!("Loaded training table with {} rows", data.n_rows()),
        );

        let (nulls_present, null_columns) = preprocessing::detect_nulls(&data);
        let data = if nulls_present {
            logger.log(
                "training",
                &format!("Imputing missing values in columns {null_columns:?}"),
            );
            preprocessing::impute_missing(
                &data,
                &self.config.numeric_columns,
                self.config.knn_neighbors,
            )?
        } else {
            data
        };

        let (features, label) =
            preprocessing::split_features_label(&data, &self.config.label_column)?;
        let feature_cols = self.config.feature_columns();
        let features = preprocessing::log_transform(&features, &feature_cols)?;

        let tracker = RunTracker::new(&self.config.registry_root, &self.config.experiment)?;
        let assigner = ClusterAssigner::new(self.config.max_clusters, self.config.random_state);

        let x = features.to_matrix();
        let n_clusters = assigner
            .choose_cluster_count(&x)?
            .ok_or(FraguarError::NoKneeFound {
                max_clusters: self.config.max_clusters,
            })?;
        logger.log(
            "training",
            &format!("Elbow search selected {n_clusters} clusters"),
        );

        let (_model, labels) = assigner.fit_assign(&x, n_clusters, &tracker)?;
        logger.log("training", "Trained clustering model and saved it");

        // Cluster ids in first-seen order; the order carries no meaning,
        // each cluster's model is independent.
        let mut cluster_ids: Vec<usize> = Vec::new();
        for &label_id in &labels {
            if !cluster_ids.contains(&label_id) {
                cluster_ids.push(label_id);
            }
        }

        let finder = ModelFinder::new(self.config.random_state);
        let mut outcomes = Vec::with_capacity(cluster_ids.len());

        for cluster_id in cluster_ids {
            logger.log("training", &format!("Training on cluster {cluster_id}"));

            let indices: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == cluster_id)
                .map(|(i, _)| i)
                .collect();

            let cluster_features = features.take(&indices)?;
            let cluster_label = label.take(&indices);

            let (train_idx, test_idx) = split_indices(
                indices.len(),
                self.config.test_size,
                Some(self.config.random_state),
            )?;

            // Each split standardizes on its own rows only.
            let train_scaled =
                preprocessing::standardize(&cluster_features.take(&train_idx)?, &feature_cols)?;
            let test_scaled =
                preprocessing::standardize(&cluster_features.take(&test_idx)?, &feature_cols)?;

            let x_train = train_scaled.to_matrix();
            let x_test = test_scaled.to_matrix();
            let y_train = cluster_label.take(&train_idx);
            let y_test = cluster_label.take(&test_idx);

            let (kind, model) = finder.select(&x_train, &y_train, &x_test, &y_test)?;
            let refinement = finder.refine(
                kind, model, &x_train, &y_train, &x_test, &y_test, cluster_id, &tracker,
            )?;

            logger.log(
                "training",
                &format!(
                    "Cluster {cluster_id}: best model {} (r2={:.4})",
                    refinement.kind.as_str(),
                    refinement.test_r2
                ),
            );

            outcomes.push(ClusterOutcome {
                cluster_id,
                algorithm: refinement.kind.as_str().to_string(),
                cv_score: refinement.cv_score,
                test_r2: refinement.test_r2,
            });
        }

        Ok(TrainingReport {
            n_clusters,
            clusters: outcomes,
        })
    }
}
