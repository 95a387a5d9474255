//! # parti
//!
//! Prototype-based clustering: K-Means and Fuzzy C-Means behind a single
//! run-to-convergence engine, plus a sweep optimizer over the cluster
//! count and evaluation scores to drive it.
//!
//! The crate takes an in-memory numeric matrix (one `Vec<f32>` per point,
//! already cleaned and encoded) and emits partitions: hard labels,
//! centroids, and — for the fuzzy variant — a membership matrix. What to
//! do with a partition (scoring, reporting, plotting) is the caller's
//! business; the [`sweep`] module only forwards partitions to an external
//! scoring callback.
//!
//! ```rust
//! use parti::{Clustering, Kmeans};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! let partition = Kmeans::new(2).with_seed(42).fit(&data).unwrap();
//! assert!(partition.converged);
//! assert_eq!(partition.labels[0], partition.labels[1]);
//! assert_ne!(partition.labels[0], partition.labels[2]);
//! ```

pub mod cluster;
/// Error types used across `parti`.
pub mod error;
pub mod metrics;
pub mod sweep;

pub use cluster::{Clustering, FuzzyCMeans, Kmeans, Partition, SoftClustering};
pub use error::{Error, Result};
pub use sweep::{Goal, KSweep, ScoreContext, SweepRecord, SweepReport};
