//! Prototype-based clustering algorithms.
//!
//! ## Hard vs soft clustering
//!
//! **Hard clustering** assigns each point to exactly one cluster — simple,
//! but it discards how close the call was. **Soft clustering** gives each
//! point a graded membership in every cluster; a point halfway between two
//! centroids is recorded as exactly that, not forced to a side.
//!
//! ## Algorithms
//!
//! ### K-means
//!
//! Assign each point to the nearest centroid, move each centroid to the
//! mean of its points, repeat. Minimizes within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! ### Fuzzy C-Means
//!
//! The soft counterpart: a K×N membership matrix U and the centroids V
//! are updated in lock-step, weighted by memberships raised to the
//! fuzziness exponent m. At m → 1⁺ the result collapses to K-means; large
//! m blurs all boundaries.
//!
//! Both run behind the same [`engine`] loop: an algorithm supplies
//! initialization, one refinement sweep, and a convergence predicate, and
//! [`engine::run_to_convergence`] does the rest.
//!
//! ## Usage
//!
//! ```rust
//! use parti::cluster::{Clustering, SoftClustering, FuzzyCMeans, Kmeans};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! // Hard clustering with K-means
//! let labels = Kmeans::new(2).with_seed(1).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! // Soft clustering with Fuzzy C-Means
//! let probs = FuzzyCMeans::new(2)
//!     .with_seed(1)
//!     .fit_predict_proba(&data)
//!     .unwrap();
//! // probs[i][k] = membership of point i in cluster k
//! assert!((probs[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
//! ```

pub mod distance;
pub mod engine;
mod fuzzy;
mod kmeans;
mod traits;

pub use engine::{run_to_convergence, ClusterState, IterativeStep, Partition, Run};
pub use fuzzy::{FcmState, FuzzyCMeans};
pub use kmeans::{Kmeans, KmeansState};
pub use traits::{Clustering, SoftClustering};

use ndarray::Array2;
use rand::prelude::*;

use crate::error::{Error, Result};

/// Validate a point list and pack it into an N×D matrix.
pub(crate) fn as_matrix(data: &[Vec<f32>]) -> Result<Array2<f32>> {
    if data.is_empty() {
        return Err(Error::EmptyInput);
    }

    let n = data.len();
    let d = data[0].len();
    let mut flat: Vec<f32> = Vec::with_capacity(n * d);
    for point in data {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
        flat.extend_from_slice(point);
    }

    Array2::from_shape_vec((n, d), flat).map_err(|e| Error::Other(e.to_string()))
}

/// Explicit random source per run: seeded for reproducibility, thread-local
/// otherwise. Never ambient global state.
pub(crate) fn rng_from_seed(seed: Option<u64>) -> Box<dyn RngCore> {
    match seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(rand::rng()),
    }
}
