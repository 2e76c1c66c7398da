//! Cluster-count search and record routing.
//!
//! One assignment model is produced per training run and persisted under a
//! fixed artifact name; prediction loads it read-only and routes each record
//! to the cluster whose specialized regressor should score it.

use crate::cluster::{ElbowLocator, KMeans};
use crate::error::{FraguarError, Result};
use crate::primitives::Matrix;
use crate::registry::RunTracker;
use crate::traits::UnsupervisedEstimator;

/// Fixed artifact name for the persisted assignment model. There is exactly
/// one per training run, regardless of how many clusters it partitions into.
pub const ASSIGNMENT_MODEL_NAME: &str = "kmeans";

/// Chooses a cluster count by elbow search and fits the shared partition
/// model.
///
/// The same random seed drives both the inertia sweep and the final fit, so
/// the elbow computed over the sweep describes the model that actually gets
/// persisted.
#[derive(Debug, Clone)]
pub struct ClusterAssigner {
    max_clusters: usize,
    random_state: u64,
}

impl ClusterAssigner {
    /// Creates an assigner that searches cluster counts `1..=max_clusters`.
    #[must_use]
    pub fn new(max_clusters: usize, random_state: u64) -> Self {
        Self {
            max_clusters,
            random_state,
        }
    }

    /// Sweeps cluster counts and returns the elbow of the inertia curve.
    ///
    /// Returns `Ok(None)` when the curve has no knee; callers must decide
    /// what that means for them — there is no fallback count.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_clusters` is zero or any sweep fit fails
    /// (for example, fewer samples than clusters).
    pub fn choose_cluster_count(&self, x: &Matrix<f32>) -> Result<Option<usize>> {
        if self.max_clusters == 0 {
            return Err(FraguarError::InvalidHyperparameter {
                param: "max_clusters".to_string(),
                value: "0".to_string(),
                constraint: ">= 1".to_string(),
            });
        }

        let counts: Vec<usize> = (1..=self.max_clusters).collect();
        let mut inertias = Vec::with_capacity(counts.len());

        for &k in &counts {
            let mut kmeans = KMeans::new(k).with_random_state(self.random_state);
            kmeans.fit(x)?;
            inertias.push(kmeans.inertia());
        }

        Ok(ElbowLocator::new(&counts, &inertias).knee())
    }

    /// Fits the final `k`-cluster model, persists it under
    /// [`ASSIGNMENT_MODEL_NAME`], and returns it with the training labels.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting or persisting fails.
    pub fn fit_assign(
        &self,
        x: &Matrix<f32>,
        k: usize,
        tracker: &RunTracker,
    ) -> Result<(KMeans, Vec<usize>)> {
        let mut kmeans = KMeans::new(k).with_random_state(self.random_state);
        kmeans.fit(x)?;
        let labels = kmeans.predict(x);

        tracker.save_artifact(&kmeans, ASSIGNMENT_MODEL_NAME)?;

        Ok((kmeans, labels))
    }

    /// Routes records through an already-fitted model. Never refits.
    #[must_use]
    pub fn assign(&self, model: &KMeans, x: &Matrix<f32>) -> Vec<usize> {
        model.predict(x)
    }

    /// Loads the persisted assignment model for read-only routing.
    ///
    /// # Errors
    ///
    /// Returns an error if no assignment model has been persisted.
    pub fn load_model(tracker: &RunTracker) -> Result<KMeans> {
        tracker.load_artifact(ASSIGNMENT_MODEL_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Three well-separated blobs of 100 points each in 2 features.
    fn three_blobs(seed: u64) -> Matrix<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        let centers = [(0.0f32, 0.0f32), (10.0, 10.0), (-10.0, 10.0)];
        let mut data = Vec::with_capacity(300 * 2);
        for &(cx, cy) in &centers {
            for _ in 0..100 {
                data.push(cx + rng.gen_range(-1.0..1.0));
                data.push(cy + rng.gen_range(-1.0..1.0));
            }
        }
        Matrix::from_vec(300, 2, data).unwrap()
    }

    fn temp_tracker() -> (tempfile::TempDir, RunTracker) {
        let dir = tempfile::tempdir().unwrap();
        let tracker = RunTracker::new(dir.path(), "test-experiment").unwrap();
        (dir, tracker)
    }

    #[test]
    fn test_choose_cluster_count_finds_three_blobs() {
        let x = three_blobs(42);
        let assigner = ClusterAssigner::new(10, 42);
        let k = assigner.choose_cluster_count(&x).unwrap();
        assert_eq!(k, Some(3));
    }

    #[test]
    fn test_choose_cluster_count_deterministic() {
        let x = three_blobs(7);
        let assigner = ClusterAssigner::new(10, 42);
        let a = assigner.choose_cluster_count(&x).unwrap();
        let b = assigner.choose_cluster_count(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_choose_cluster_count_zero_max_rejected() {
        let x = three_blobs(42);
        let assigner = ClusterAssigner::new(0, 42);
        assert!(assigner.choose_cluster_count(&x).is_err());
    }

    #[test]
    fn test_inertia_sweep_non_increasing() {
        let x = three_blobs(42);
        let mut inertias = Vec::new();
        for k in 1..=6 {
            let mut kmeans = KMeans::new(k).with_random_state(42);
            kmeans.fit(&x).unwrap();
            inertias.push(kmeans.inertia());
        }
        for pair in inertias.windows(2) {
            assert!(
                pair[1] <= pair[0] * 1.001,
                "inertia increased: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_fit_assign_covers_all_rows_with_three_ids() {
        let x = three_blobs(42);
        let (_dir, tracker) = temp_tracker();
        let assigner = ClusterAssigner::new(10, 42);

        let (model, labels) = assigner.fit_assign(&x, 3, &tracker).unwrap();
        assert_eq!(labels.len(), 300);
        assert_eq!(model.n_clusters(), 3);

        let mut seen = std::collections::BTreeSet::new();
        for &label in &labels {
            assert!(label < 3);
            seen.insert(label);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_persisted_model_routes_like_original() {
        let x = three_blobs(42);
        let (_dir, tracker) = temp_tracker();
        let assigner = ClusterAssigner::new(10, 42);

        let (model, _) = assigner.fit_assign(&x, 3, &tracker).unwrap();
        let loaded = ClusterAssigner::load_model(&tracker).unwrap();

        assert_eq!(assigner.assign(&model, &x), assigner.assign(&loaded, &x));
    }

    #[test]
    fn test_load_model_missing_fails() {
        let (_dir, tracker) = temp_tracker();
        assert!(ClusterAssigner::load_model(&tracker).is_err());
    }
}
