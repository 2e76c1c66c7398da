//! Knee detection for the cluster-count search.
//!
//! Finds the elbow of a convex, decreasing curve — the point past which
//! adding clusters stops paying for itself — as the interior point with the
//! largest drop below the chord joining the curve's endpoints.

/// Locates the knee of a convex decreasing series such as an inertia curve.
///
/// Returns `None` when the series has no usable knee: fewer than three
/// points, a flat series, or a series that never dips below its chord. The
/// caller must handle the absent case explicitly; there is no default.
///
/// # Examples
///
/// ```
/// use fraguar::cluster::ElbowLocator;
///
/// let counts = [1, 2, 3, 4, 5, 6];
/// let inertias = [1000.0, 400.0, 50.0, 45.0, 40.0, 38.0];
/// let locator = ElbowLocator::new(&counts, &inertias);
/// assert_eq!(locator.knee(), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct ElbowLocator {
    counts: Vec<usize>,
    values: Vec<f32>,
}

impl ElbowLocator {
    /// Creates a locator over `(count, value)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if the slices have different lengths.
    #[must_use]
    pub fn new(counts: &[usize], values: &[f32]) -> Self {
        assert_eq!(
            counts.len(),
            values.len(),
            "counts and values must have same length"
        );
        Self {
            counts: counts.to_vec(),
            values: values.to_vec(),
        }
    }

    /// Returns the count at the knee, or `None` if no knee exists.
    #[must_use]
    pub fn knee(&self) -> Option<usize> {
        let n = self.counts.len();
        if n < 3 {
            return None;
        }

        let x_first = self.counts[0] as f32;
        let x_last = self.counts[n - 1] as f32;
        let x_span = x_last - x_first;
        if x_span <= 0.0 {
            return None;
        }

        let y_min = self.values.iter().copied().fold(f32::INFINITY, f32::min);
        let y_max = self
            .values
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let y_span = y_max - y_min;
        if y_span <= 0.0 || !y_span.is_finite() {
            return None;
        }

        // Normalize to the unit square; the chord of a decreasing curve runs
        // from (0, y'_first) to (1, y'_last). A convex curve dips below it.
        let y_first = (self.values[0] - y_min) / y_span;
        let y_last = (self.values[n - 1] - y_min) / y_span;

        let mut best_drop = 0.0;
        let mut best_idx = None;

        for i in 1..n - 1 {
            let x = (self.counts[i] as f32 - x_first) / x_span;
            let y = (self.values[i] - y_min) / y_span;
            let chord = y_first + (y_last - y_first) * x;
            let drop = chord - y;
            if drop > best_drop {
                best_drop = drop;
                best_idx = Some(i);
            }
        }

        if best_drop <= 1e-6 {
            return None;
        }

        best_idx.map(|i| self.counts[i])
    }
}
