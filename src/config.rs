//! Pipeline configuration.
//!
//! Every orchestrator receives an explicit `PipelineConfig` at construction.
//! There is no ambient global state: paths, schema constants, and seeds all
//! travel through this object.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration shared by the training and prediction pipelines.
///
/// # Examples
///
/// ```
/// use fraguar::config::PipelineConfig;
///
/// let config = PipelineConfig::new("workspace")
///     .with_max_clusters(8)
///     .with_random_state(7);
/// assert_eq!(config.max_clusters, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Incoming raw training batch files.
    pub raw_training_dir: PathBuf,
    /// Incoming raw prediction batch files.
    pub raw_prediction_dir: PathBuf,
    /// Working root for good/bad/archive classification.
    pub validated_root: PathBuf,
    /// Root of the flat-file table store.
    pub store_root: PathBuf,
    /// Schema descriptor for training batches.
    pub training_schema_path: PathBuf,
    /// Schema descriptor for prediction batches.
    pub prediction_schema_path: PathBuf,
    /// Intake run log file.
    pub ingestion_log_path: PathBuf,
    /// Row-chunk size for table export.
    pub chunk_size: usize,
    /// Exported training table (features plus label column).
    pub training_data_path: PathBuf,
    /// Exported prediction table (features only).
    pub prediction_data_path: PathBuf,
    /// Destination of the single prediction output artifact.
    pub prediction_output_path: PathBuf,
    /// Root directory of the run tracker and model registry.
    pub registry_root: PathBuf,
    /// Experiment name for tracked runs.
    pub experiment: String,
    /// Training run log file.
    pub training_log_path: PathBuf,
    /// Prediction run log file.
    pub prediction_log_path: PathBuf,
    /// Name of the label column in the training table.
    pub label_column: String,
    /// Numeric columns of the training table, label included.
    pub numeric_columns: Vec<String>,
    /// Ceiling of the cluster-count search.
    pub max_clusters: usize,
    /// Held-out fraction for the per-cluster train/test split.
    pub test_size: f32,
    /// Seed for every randomized component.
    pub random_state: u64,
    /// Neighbor count for KNN imputation.
    pub knn_neighbors: usize,
}

impl PipelineConfig {
    /// Creates a configuration rooted at `root` with the concrete-mix
    /// schema and standard defaults.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            raw_training_dir: root.join("raw/training"),
            raw_prediction_dir: root.join("raw/prediction"),
            validated_root: root.join("validated"),
            store_root: root.join("store"),
            training_schema_path: root.join("schema/schema_training.json"),
            prediction_schema_path: root.join("schema/schema_prediction.json"),
            ingestion_log_path: root.join("logs/ingestion.log"),
            chunk_size: 200,
            training_data_path: root.join("data/training_from_store.csv"),
            prediction_data_path: root.join("data/prediction_from_store.csv"),
            prediction_output_path: root.join("output/predictions.csv"),
            registry_root: root.join("registry"),
            experiment: "cement-strength".to_string(),
            training_log_path: root.join("logs/training.log"),
            prediction_log_path: root.join("logs/prediction.log"),
            label_column: "concrete_compressive_strength".to_string(),
            numeric_columns: vec![
                "cement".to_string(),
                "blast_furnace_slag".to_string(),
                "fly_ash".to_string(),
                "water".to_string(),
                "superplasticizer".to_string(),
                "coarse_aggregate".to_string(),
                "fine_aggregate".to_string(),
                "age".to_string(),
                "concrete_compressive_strength".to_string(),
            ],
            max_clusters: 10,
            test_size: 1.0 / 3.0,
            random_state: 42,
            knn_neighbors: 5,
        }
    }

    /// Sets the label column.
    #[must_use]
    pub fn with_label_column(mut self, label_column: &str) -> Self {
        self.label_column = label_column.to_string();
        self
    }

    /// Sets the numeric columns (label included for the training table).
    #[must_use]
    pub fn with_numeric_columns(mut self, numeric_columns: Vec<String>) -> Self {
        self.numeric_columns = numeric_columns;
        self
    }

    /// Sets the cluster-count search ceiling.
    #[must_use]
    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    /// Sets the held-out fraction.
    #[must_use]
    pub fn with_test_size(mut self, test_size: f32) -> Self {
        self.test_size = test_size;
        self
    }

    /// Sets the shared random seed.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Sets the experiment name.
    #[must_use]
    pub fn with_experiment(mut self, experiment: &str) -> Self {
        self.experiment = experiment.to_string();
        self
    }

    /// Numeric feature columns: the numeric columns minus the label.
    #[must_use]
    pub fn feature_columns(&self) -> Vec<String> {
        self.numeric_columns
            .iter()
            .filter(|name| **name != self.label_column)
            .cloned()
            .collect()
    }
}
