//! The prediction orchestrator.
//!
//! Mirrors the training preprocessing exactly — null check, imputation, log
//! transform — then routes every record through the persisted cluster
//! model and scores each cluster's subset with that cluster's persisted
//! regressor. A record must see the identical transform chain it would
//! have seen at training time before it reaches a model; anything else
//! silently produces wrong predictions rather than a crash.
//!
//! The output artifact carries the transformed features plus a
//! `Predictions` column, in the original input row order. A missing
//! per-cluster model aborts the run before any output is written.

use crate::cluster::ClusterAssigner;
use crate::config::PipelineConfig;
use crate::data::DataFrame;
use crate::error::Result;
use crate::logging::FileLogger;
use crate::preprocessing;
use crate::primitives::Vector;
use crate::registry::{RunTracker, MODEL_NAME_TAG};
use crate::selection::{production_model_tag, CandidateModel};
use crate::traits::{Estimator, UnsupervisedEstimator};
use std::path::PathBuf;

/// Summary of a completed prediction run.
#[derive(Debug, Clone)]
pub struct PredictionReport {
    /// Number of records scored.
    pub n_rows: usize,
    /// Number of distinct clusters encountered in the batch.
    pub n_clusters: usize,
    /// Where the output artifact was written.
    pub output_path: PathBuf,
}

/// Runs the full prediction sequence against a configuration.
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    config: PipelineConfig,
}

impl PredictionPipeline {
    /// Creates a prediction pipeline for `config`.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Executes the prediction run.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure — including a missing per-cluster
    /// model — without writing any output. The failure is also logged.
    pub fn run(&self) -> Result<PredictionReport> {
        let logger = FileLogger::create(&self.config.prediction_log_path)?;
        logger.log("prediction", "Received prediction request");

        match self.run_stages(&logger) {
            Ok(report) => {
                logger.log("prediction", "Successful end of prediction");
                Ok(report)
            }
            Err(e) => {
                logger.log("prediction", &format!("Prediction failed: {e}"));
                Err(e)
            }
        }
    }

    fn run_stages(&self, logger: &FileLogger) -> Result<PredictionReport> {
        let data = DataFrame::read_csv(&self.config.prediction_data_path)?;
        logger.log(
            "prediction",
            &format!("Loaded prediction table with {} rows", data.n_rows()),
        );

        let feature_cols = self.config.feature_columns();

        let (nulls_present, null_columns) = preprocessing::detect_nulls(&data);
        let data = if nulls_present {
            logger.log(
                "prediction",
                &format!("Imputing missing values in columns {null_columns:?}"),
            );
            preprocessing::impute_missing(&data, &feature_cols, self.config.knn_neighbors)?
        } else {
            data
        };

        let features = preprocessing::log_transform(&data, &feature_cols)?;

        let tracker = RunTracker::new(&self.config.registry_root, &self.config.experiment)?;
        let cluster_model = ClusterAssigner::load_model(&tracker)?;
        let labels = cluster_model.predict(&features.to_matrix());

        let mut cluster_ids: Vec<usize> = Vec::new();
        for &label_id in &labels {
            if !cluster_ids.contains(&label_id) {
                cluster_ids.push(label_id);
            }
        }
        logger.log(
            "prediction",
            &format!("Batch spans {} cluster(s)", cluster_ids.len()),
        );

        // (original row index, prediction) pairs, restored to input order
        // before assembly.
        let mut predictions: Vec<(usize, f32)> = Vec::with_capacity(features.n_rows());

        for &cluster_id in &cluster_ids {
            let indices: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == cluster_id)
                .map(|(i, _)| i)
                .collect();

            let subset = features.take(&indices)?;
            // Standardization refits on this cluster's batch, the same
            // recompute-per-call rule the training side uses.
            let scaled = preprocessing::standardize(&subset, &feature_cols)?;
            let x = scaled.to_matrix();

            let tag = production_model_tag(cluster_id);
            let model: CandidateModel = tracker.load_artifact_by_tag(MODEL_NAME_TAG, &tag)?;
            logger.log("prediction", &format!("Loaded model '{tag}'"));

            for (pos, &original_idx) in indices.iter().enumerate() {
                let row = x.take_rows(&[pos]);
                let predicted = model.predict(&row);
                predictions.push((original_idx, predicted[0]));
            }
        }

        predictions.sort_by_key(|&(original_idx, _)| original_idx);
        let values = Vector::from_vec(predictions.iter().map(|&(_, p)| p).collect());

        let mut output = features;
        output.add_column("Predictions".to_string(), values)?;
        output.write_csv(&self.config.prediction_output_path)?;

        Ok(PredictionReport {
            n_rows: output.n_rows(),
            n_clusters: cluster_ids.len(),
            output_path: self.config.prediction_output_path.clone(),
        })
    }
}
