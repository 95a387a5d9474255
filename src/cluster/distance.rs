//! Euclidean distance computations shared by the clustering algorithms.
//!
//! Data points stay `f32` (the input representation) while centroids are
//! accumulated in `f64`. Everything here returns `f64` so downstream
//! comparisons and loss sums are done at full precision.

use ndarray::{Array2, ArrayView1};

/// Squared Euclidean distance between a data point and a centroid.
#[inline]
pub fn squared_to_centroid(point: &ArrayView1<'_, f32>, centroid: &ArrayView1<'_, f64>) -> f64 {
    point
        .iter()
        .zip(centroid.iter())
        .map(|(x, c)| {
            let diff = *x as f64 - c;
            diff * diff
        })
        .sum()
}

/// Euclidean distance between a data point and a centroid.
#[inline]
pub fn distance_to_centroid(point: &ArrayView1<'_, f32>, centroid: &ArrayView1<'_, f64>) -> f64 {
    squared_to_centroid(point, centroid).sqrt()
}

/// L1 norm of the element-wise difference between two equally shaped
/// matrices. Used as the centroid-movement convergence criterion.
pub fn l1_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Full N×N Euclidean distance matrix between rows of `data`.
///
/// Computed once per sweep when a scoring callback wants precomputed
/// distances instead of recomputing them per candidate.
pub fn pairwise_distances(data: &[Vec<f32>]) -> Array2<f64> {
    let n = data.len();
    let mut out = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = data[i]
                .iter()
                .zip(data[j].iter())
                .map(|(a, b)| {
                    let diff = (*a - *b) as f64;
                    diff * diff
                })
                .sum::<f64>()
                .sqrt();
            out[[i, j]] = dist;
            out[[j, i]] = dist;
        }
    }
    out
}
