//! End-to-end tests for the training and prediction pipelines.
//!
//! These build synthetic concrete-mix tables on disk, run the full
//! orchestrators against temp directories, and check the persisted models,
//! routing, and output artifacts.

use fraguar::cluster::{ClusterAssigner, ASSIGNMENT_MODEL_NAME};
use fraguar::config::PipelineConfig;
use fraguar::data::DataFrame;
use fraguar::error::FraguarError;
use fraguar::pipeline::{PredictionPipeline, TrainingPipeline};
use fraguar::prelude::*;
use fraguar::registry::{RunTracker, MODEL_NAME_TAG};
use fraguar::selection::{production_model_tag, CandidateModel};
use std::fs;
use std::path::Path;

/// Two behaviorally different segments:
/// segment A: label = 2·ln(x1+1); segment B: label = −3·ln(x1+1) + 10.
fn segment_a_row(i: usize) -> (f32, f32, f32) {
    let x1 = 20.0 + i as f32;
    let x2 = 2.0 + (i % 7) as f32 * 0.3;
    let label = 2.0 * (x1 + 1.0).ln();
    (x1, x2, label)
}

fn segment_b_row(i: usize) -> (f32, f32, f32) {
    let x1 = 400.0 + 2.0 * i as f32;
    let x2 = 300.0 + (i % 5) as f32 * 3.0;
    let label = -3.0 * (x1 + 1.0).ln() + 10.0;
    (x1, x2, label)
}

fn write_training_csv(path: &Path, rows_per_segment: usize) {
    let mut csv = String::from("x1,x2,strength\n");
    for i in 0..rows_per_segment {
        let (x1, x2, label) = segment_a_row(i);
        csv.push_str(&format!("{x1},{x2},{label}\n"));
    }
    for i in 0..rows_per_segment {
        let (x1, x2, label) = segment_b_row(i);
        csv.push_str(&format!("{x1},{x2},{label}\n"));
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, csv).unwrap();
}

/// Prediction rows interleave the two segments so the output-order check is
/// meaningful.
fn write_prediction_csv(path: &Path, rows_per_segment: usize) {
    let mut csv = String::from("x1,x2\n");
    for i in 0..rows_per_segment {
        let (ax1, ax2, _) = segment_a_row(i);
        csv.push_str(&format!("{ax1},{ax2}\n"));
        let (bx1, bx2, _) = segment_b_row(i);
        csv.push_str(&format!("{bx1},{bx2}\n"));
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, csv).unwrap();
}

fn test_config(root: &Path) -> PipelineConfig {
    PipelineConfig::new(root)
        .with_label_column("strength")
        .with_numeric_columns(vec![
            "x1".to_string(),
            "x2".to_string(),
            "strength".to_string(),
        ])
}

#[test]
fn test_training_discovers_segments_and_picks_linear() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_training_csv(&config.training_data_path, 60);

    let report = TrainingPipeline::new(config.clone()).run().unwrap();

    assert_eq!(report.n_clusters, 2);
    assert_eq!(report.clusters.len(), 2);
    for outcome in &report.clusters {
        assert_eq!(outcome.algorithm, "linear_regression");
        assert!(
            outcome.test_r2 > 0.99,
            "cluster {} r2 {}",
            outcome.cluster_id,
            outcome.test_r2
        );
        // Linear regression has no grid, so refinement kept the first fit.
        assert!(outcome.cv_score.is_none());
    }

    // One assignment model plus one tagged run per cluster.
    let tracker = RunTracker::new(&config.registry_root, &config.experiment).unwrap();
    let kmeans: KMeans = tracker.load_artifact(ASSIGNMENT_MODEL_NAME).unwrap();
    assert_eq!(kmeans.n_clusters(), 2);

    let runs = tracker.search_runs().unwrap();
    assert_eq!(runs.len(), 2);
    let mut tags: Vec<&str> = runs
        .iter()
        .map(|r| r.tags[MODEL_NAME_TAG].as_str())
        .collect();
    tags.sort_unstable();
    assert_eq!(tags, vec!["prediction_model_0", "prediction_model_1"]);
}

#[test]
fn test_training_is_reproducible() {
    let dir_a = tempfile::tempdir().unwrap();
    let config_a = test_config(dir_a.path());
    write_training_csv(&config_a.training_data_path, 60);

    let dir_b = tempfile::tempdir().unwrap();
    let config_b = test_config(dir_b.path());
    write_training_csv(&config_b.training_data_path, 60);

    let report_a = TrainingPipeline::new(config_a).run().unwrap();
    let report_b = TrainingPipeline::new(config_b).run().unwrap();

    assert_eq!(report_a.n_clusters, report_b.n_clusters);
    for (a, b) in report_a.clusters.iter().zip(report_b.clusters.iter()) {
        assert_eq!(a.cluster_id, b.cluster_id);
        assert_eq!(a.algorithm, b.algorithm);
        assert_eq!(a.test_r2, b.test_r2);
    }
}

#[test]
fn test_training_handles_missing_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_training_csv(&config.training_data_path, 60);

    // Blank out a few cells; the imputation stage has to fill them.
    let content = fs::read_to_string(&config.training_data_path).unwrap();
    let mut lines: Vec<String> = content.lines().map(String::from).collect();
    let fields: Vec<&str> = lines[3].split(',').collect();
    lines[3] = format!("{},,{}", fields[0], fields[2]);
    fs::write(&config.training_data_path, lines.join("\n") + "\n").unwrap();

    let report = TrainingPipeline::new(config).run().unwrap();
    assert_eq!(report.n_clusters, 2);
}

#[test]
fn test_training_fails_without_elbow() {
    let dir = tempfile::tempdir().unwrap();
    // A two-point sweep can never expose a knee.
    let config = test_config(dir.path()).with_max_clusters(2);
    write_training_csv(&config.training_data_path, 60);

    let result = TrainingPipeline::new(config).run();
    assert!(matches!(
        result,
        Err(FraguarError::NoKneeFound { max_clusters: 2 })
    ));
}

#[test]
fn test_end_to_end_training_then_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_training_csv(&config.training_data_path, 60);
    write_prediction_csv(&config.prediction_data_path, 30);

    TrainingPipeline::new(config.clone()).run().unwrap();
    let report = PredictionPipeline::new(config.clone()).run().unwrap();

    assert_eq!(report.n_rows, 60);
    assert_eq!(report.n_clusters, 2);

    let output = DataFrame::read_csv(&report.output_path).unwrap();
    assert_eq!(output.n_rows(), 60);
    assert!(output.has_column("Predictions"));

    // Output rows are in the original input order: the transformed x1
    // column must match ln(input+1) row for row.
    let input = DataFrame::read_csv(&config.prediction_data_path).unwrap();
    let input_x1 = input.column("x1").unwrap();
    let output_x1 = output.column("x1").unwrap();
    for i in 0..input_x1.len() {
        let expected = (input_x1[i] + 1.0).ln();
        assert!(
            (output_x1[i] - expected).abs() < 1e-4,
            "row {i} out of order"
        );
    }

    // Even rows come from segment A (positive labels), odd rows from
    // segment B (negative labels); each must have been scored by its own
    // cluster's model.
    let predictions = output.column("Predictions").unwrap();
    for i in 0..predictions.len() {
        if i % 2 == 0 {
            assert!(
                predictions[i] > 3.0,
                "row {i} predicted {} for segment A",
                predictions[i]
            );
        } else {
            assert!(
                predictions[i] < 0.0,
                "row {i} predicted {} for segment B",
                predictions[i]
            );
        }
    }
}

/// Fits an intercept-only model that predicts `value` everywhere.
fn constant_model(value: f32) -> CandidateModel {
    let x = Matrix::from_vec(4, 2, vec![1.0, 5.0, 2.0, 3.0, 3.0, 8.0, 4.0, 1.0]).unwrap();
    let y = Vector::from_slice(&[value, value, value, value]);
    let mut model = LinearRegression::new();
    model.fit(&x, &y).unwrap();
    CandidateModel::Linear(model)
}

#[test]
fn test_prediction_routes_records_to_their_cluster_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_prediction_csv(&config.prediction_data_path, 10);

    // Hand-build a registry: a cluster model fitted on the transformed
    // feature space, plus one constant regressor per cluster whose output
    // encodes which model was invoked.
    let input = DataFrame::read_csv(&config.prediction_data_path).unwrap();
    let feature_cols = config.feature_columns();
    let transformed =
        fraguar::preprocessing::log_transform(&input, &feature_cols).unwrap();
    let x = transformed.to_matrix();

    let tracker = RunTracker::new(&config.registry_root, &config.experiment).unwrap();
    let assigner = ClusterAssigner::new(10, config.random_state);
    let (model, labels) = assigner.fit_assign(&x, 2, &tracker).unwrap();

    let segment_a_cluster = labels[0];
    let segment_b_cluster = labels[1];
    assert_ne!(segment_a_cluster, segment_b_cluster);

    for (cluster_id, value) in [(segment_a_cluster, 111.0), (segment_b_cluster, 222.0)] {
        let tag = production_model_tag(cluster_id);
        tracker.save_artifact(&constant_model(value), &tag).unwrap();
        let mut run = tracker.start_run().unwrap();
        run.set_tag(MODEL_NAME_TAG, &tag);
        tracker.log_run(&run).unwrap();
    }

    let report = PredictionPipeline::new(config).run().unwrap();
    let output = DataFrame::read_csv(&report.output_path).unwrap();
    let predictions = output.column("Predictions").unwrap();

    // Interleaved input: even rows are segment A, odd rows segment B.
    for i in 0..predictions.len() {
        let expected = if i % 2 == 0 { 111.0 } else { 222.0 };
        assert!(
            (predictions[i] - expected).abs() < 0.5,
            "row {i}: predicted {} expected {expected}",
            predictions[i]
        );
    }

    // The persisted assignment model is what routed the records.
    let loaded: KMeans = tracker.load_artifact(ASSIGNMENT_MODEL_NAME).unwrap();
    assert_eq!(loaded.predict(&x), model.predict(&x));
}

#[test]
fn test_prediction_missing_cluster_model_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_prediction_csv(&config.prediction_data_path, 10);

    let input = DataFrame::read_csv(&config.prediction_data_path).unwrap();
    let feature_cols = config.feature_columns();
    let transformed =
        fraguar::preprocessing::log_transform(&input, &feature_cols).unwrap();
    let x = transformed.to_matrix();

    let tracker = RunTracker::new(&config.registry_root, &config.experiment).unwrap();
    let assigner = ClusterAssigner::new(10, config.random_state);
    let (_model, labels) = assigner.fit_assign(&x, 2, &tracker).unwrap();

    // Persist a model for only one of the two clusters.
    let only_cluster = labels[0];
    let tag = production_model_tag(only_cluster);
    tracker.save_artifact(&constant_model(1.0), &tag).unwrap();
    let mut run = tracker.start_run().unwrap();
    run.set_tag(MODEL_NAME_TAG, &tag);
    tracker.log_run(&run).unwrap();

    let result = PredictionPipeline::new(config.clone()).run();
    assert!(matches!(result, Err(FraguarError::ModelNotFound { .. })));
    assert!(
        !config.prediction_output_path.exists(),
        "failed run must not leave partial output"
    );
}

#[test]
fn test_intake_validates_inserts_and_exports() {
    use fraguar::ingestion::{ColumnSpec, IngestionSchema};
    use fraguar::pipeline::IntakePipeline;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let schema = IngestionSchema {
        filename_prefix: "cement_strength".to_string(),
        date_stamp_length: 8,
        time_stamp_length: 6,
        n_columns: 3,
        columns: vec![
            ColumnSpec {
                name: "x1".to_string(),
                dtype: "float".to_string(),
            },
            ColumnSpec {
                name: "x2".to_string(),
                dtype: "float".to_string(),
            },
            ColumnSpec {
                name: "strength".to_string(),
                dtype: "float".to_string(),
            },
        ],
    };
    schema.save(&config.training_schema_path).unwrap();

    fs::create_dir_all(&config.raw_training_dir).unwrap();
    fs::write(
        config.raw_training_dir.join("cement_strength_08012020_120021.csv"),
        "x1,x2,strength\n540.0,162.0,79.99\n332.5,228.0,61.89\n",
    )
    .unwrap();
    fs::write(
        config.raw_training_dir.join("cement_strength_09012020_093000.csv"),
        "x1,x2,strength\n198.6,192.0,44.3\n",
    )
    .unwrap();
    // Wrong stamp lengths: must be rejected and archived.
    fs::write(
        config.raw_training_dir.join("cement_strength_0801_12.csv"),
        "x1,x2,strength\n1.0,2.0,3.0\n",
    )
    .unwrap();

    let report = IntakePipeline::new(config.clone()).run_training().unwrap();
    assert_eq!(report.good_files, 2);
    assert_eq!(report.bad_files, 1);
    assert_eq!(report.rows_inserted, 3);
    assert_eq!(report.rows_exported, 3);

    let exported = DataFrame::read_csv(&report.export_path).unwrap();
    assert_eq!(exported.shape(), (3, 3));
    assert_eq!(exported.column_names(), vec!["x1", "x2", "strength"]);

    // The bad file was swept to the archive and the work dirs are gone.
    let archive: Vec<_> = fs::read_dir(config.validated_root.join("archive"))
        .unwrap()
        .collect();
    assert_eq!(archive.len(), 1);
    assert!(!config.validated_root.join("good_raw").exists());
}

#[test]
fn test_prediction_without_training_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_prediction_csv(&config.prediction_data_path, 5);

    let result = PredictionPipeline::new(config).run();
    assert!(matches!(result, Err(FraguarError::ModelNotFound { .. })));
}
