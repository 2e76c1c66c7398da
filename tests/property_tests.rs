//! Property-based tests using proptest.
//!
//! These verify invariants of the preprocessing transforms, the splitting
//! utilities, and the cluster-count search.

use fraguar::cluster::{ElbowLocator, KMeans};
use fraguar::data::DataFrame;
use fraguar::model_selection::{split_indices, KFold};
use fraguar::prelude::*;
use fraguar::preprocessing::{log_transform, standardize};
use proptest::prelude::*;

fn frame_from(values: Vec<f32>) -> DataFrame {
    DataFrame::new(vec![("a".to_string(), Vector::from_vec(values))]).unwrap()
}

/// Three blobs around well-separated centers, jitter in [-1, 1].
fn blob_matrix(offsets: &[f32]) -> Matrix<f32> {
    let centers = [(0.0f32, 0.0f32), (20.0, 0.0), (0.0, 20.0)];
    let mut data = Vec::with_capacity(offsets.len() * 2 * 3);
    for &(cx, cy) in &centers {
        for &offset in offsets {
            data.push(cx + offset);
            data.push(cy - offset * 0.5);
        }
    }
    Matrix::from_vec(offsets.len() * 3, 2, data).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Transform properties

    #[test]
    fn log_transform_round_trips(values in proptest::collection::vec(0.0f32..1000.0, 3..40)) {
        let df = frame_from(values.clone());
        let cols = vec!["a".to_string()];
        let transformed = log_transform(&df, &cols).unwrap();
        let col = transformed.column("a").unwrap();

        for (i, &original) in values.iter().enumerate() {
            let back = col[i].exp() - 1.0;
            prop_assert!((back - original).abs() < 1e-2 * (1.0 + original.abs()));
        }
    }

    #[test]
    fn log_transform_is_monotonic(a in 0.0f32..500.0, b in 0.0f32..500.0) {
        let df = frame_from(vec![a, b]);
        let cols = vec!["a".to_string()];
        let transformed = log_transform(&df, &cols).unwrap();
        let col = transformed.column("a").unwrap();
        if a < b {
            prop_assert!(col[0] < col[1]);
        }
    }

    #[test]
    fn standardize_centers_columns(values in proptest::collection::vec(-100.0f32..100.0, 5..40)) {
        let df = frame_from(values);
        let cols = vec!["a".to_string()];
        let scaled = standardize(&df, &cols).unwrap();
        let col = scaled.column("a").unwrap();
        prop_assert!(col.mean().abs() < 1e-3);
    }

    #[test]
    fn standardize_constant_column_never_nan(value in -1000.0f32..1000.0, n in 3usize..30) {
        let df = frame_from(vec![value; n]);
        let cols = vec!["a".to_string()];
        let scaled = standardize(&df, &cols).unwrap();
        for &v in scaled.column("a").unwrap().as_slice() {
            prop_assert!(!v.is_nan());
            prop_assert_eq!(v, 0.0);
        }
    }

    // Splitting properties

    #[test]
    fn split_indices_partitions_exactly(n in 10usize..200, seed in 0u64..1000) {
        let (train, test) = split_indices(n, 0.3, Some(seed)).unwrap();
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn kfold_uses_every_sample_once(n in 10usize..100, seed in 0u64..1000) {
        let splits = KFold::new(5).with_random_state(seed).split(n);
        let mut all_test: Vec<usize> = splits.iter().flat_map(|(_, t)| t).copied().collect();
        all_test.sort_unstable();
        prop_assert_eq!(all_test, (0..n).collect::<Vec<_>>());
    }

    // Elbow properties

    #[test]
    fn elbow_knee_is_interior(
        values in proptest::collection::vec(1.0f32..1000.0, 4..12)
    ) {
        let mut sorted = values;
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let counts: Vec<usize> = (1..=sorted.len()).collect();
        if let Some(knee) = ElbowLocator::new(&counts, &sorted).knee() {
            prop_assert!(knee > counts[0]);
            prop_assert!(knee < counts[counts.len() - 1]);
        }
    }
}

proptest! {
    // K-Means fits dominate these cases; keep the count modest.
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn inertia_is_non_increasing_in_cluster_count(
        offsets in proptest::collection::vec(-1.0f32..1.0, 8..15),
        seed in 0u64..100
    ) {
        let x = blob_matrix(&offsets);
        let mut previous = f32::INFINITY;
        for k in 1..=6 {
            let mut kmeans = KMeans::new(k).with_random_state(seed);
            kmeans.fit(&x).unwrap();
            let inertia = kmeans.inertia();
            prop_assert!(
                inertia <= previous * 1.001 + 1e-3,
                "inertia rose from {} to {} at k={}",
                previous,
                inertia,
                k
            );
            previous = inertia;
        }
    }

    #[test]
    fn kmeans_labels_are_stable_for_seed(
        offsets in proptest::collection::vec(-1.0f32..1.0, 8..12),
        seed in 0u64..100
    ) {
        let x = blob_matrix(&offsets);
        let mut a = KMeans::new(3).with_random_state(seed);
        a.fit(&x).unwrap();
        let mut b = KMeans::new(3).with_random_state(seed);
        b.fit(&x).unwrap();
        prop_assert_eq!(a.predict(&x), b.predict(&x));
    }
}
