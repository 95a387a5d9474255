//! Hyperparameter sweep over the cluster count K.
//!
//! The sweep treats the clustering algorithm as a black box: a factory
//! closure builds and runs a clusterer for each candidate K, an external
//! scoring callback grades the resulting [`Partition`], and the report
//! ranks all candidates by score in the direction of the [`Goal`].
//!
//! Scoring stays outside this crate's algorithms on purpose; see
//! [`crate::metrics`] for ready-made callbacks.
//!
//! Candidates are independent, so with the `parallel` feature they run on
//! a rayon pool (optionally bounded to a worker count). Each candidate's
//! outcome lands in its own slot and the slots are combined
//! deterministically afterward, so results never depend on completion
//! order.
//!
//! A failing candidate — invalid configuration for that K, numeric
//! instability — is reported in [`SweepReport::failures`] and excluded
//! from the ranking rather than aborting the sweep.

use core::cmp::Ordering;

use ndarray::Array2;

use crate::cluster::distance::pairwise_distances;
use crate::cluster::Partition;
use crate::error::{Error, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Direction the sweep optimizes the score in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Lower scores are better (e.g. Davies-Bouldin, Xie-Beni).
    Minimize,
    /// Higher scores are better (e.g. Calinski-Harabasz).
    Maximize,
}

/// One successfully scored candidate.
#[derive(Debug, Clone)]
pub struct SweepRecord {
    /// Candidate cluster count.
    pub k: usize,
    /// Score the external callback assigned to this candidate's partition.
    pub score: f64,
    /// The converged partition for this candidate.
    pub partition: Partition,
}

/// A candidate whose run or scoring failed.
#[derive(Debug, Clone)]
pub struct SweepFailure {
    /// Candidate cluster count.
    pub k: usize,
    /// What went wrong.
    pub error: Error,
}

/// Ranked outcome of a sweep.
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Successful candidates, sorted best first according to the goal.
    /// Ties keep candidate order (lowest K first).
    pub records: Vec<SweepRecord>,
    /// Candidates excluded from the ranking.
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    /// The best-scoring candidate, if any succeeded.
    pub fn best(&self) -> Option<&SweepRecord> {
        self.records.first()
    }

    /// The record for a specific candidate, e.g. K equal to a reference
    /// class count.
    pub fn for_k(&self, k: usize) -> Option<&SweepRecord> {
        self.records.iter().find(|record| record.k == k)
    }
}

/// Everything a scoring callback may look at.
pub struct ScoreContext<'a> {
    /// The input points.
    pub data: &'a [Vec<f32>],
    /// The candidate's converged partition.
    pub partition: &'a Partition,
    /// N×N Euclidean distance matrix, present when requested via
    /// [`KSweep::with_pairwise_distances`]. Computed once per sweep.
    pub pairwise: Option<&'a Array2<f64>>,
}

/// Sweep of candidate cluster counts.
///
/// ```rust
/// use parti::cluster::Kmeans;
/// use parti::sweep::{Goal, KSweep};
/// use parti::metrics;
///
/// let data = vec![
///     vec![0.0, 0.0],
///     vec![0.2, 0.1],
///     vec![10.0, 10.0],
///     vec![10.2, 10.1],
///     vec![20.0, 0.0],
///     vec![20.2, 0.1],
/// ];
///
/// let report = KSweep::new([2, 3])
///     .with_goal(Goal::Maximize)
///     .run(
///         &data,
///         |k, data| Kmeans::new(k).with_seed(42).fit(data),
///         |ctx| metrics::calinski_harabasz(ctx.data, &ctx.partition.labels),
///     );
///
/// assert_eq!(report.best().unwrap().k, 3);
/// ```
#[derive(Debug, Clone)]
pub struct KSweep {
    candidates: Vec<usize>,
    goal: Goal,
    precompute_pairwise: bool,
    #[cfg(feature = "parallel")]
    workers: Option<usize>,
}

impl KSweep {
    /// Create a sweep over the given candidate cluster counts.
    pub fn new(candidates: impl IntoIterator<Item = usize>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            goal: Goal::Minimize,
            precompute_pairwise: false,
            #[cfg(feature = "parallel")]
            workers: None,
        }
    }

    /// Set the optimization direction (default: minimize).
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    /// Precompute the N×N pairwise distance matrix once and hand it to
    /// every scoring call.
    pub fn with_pairwise_distances(mut self) -> Self {
        self.precompute_pairwise = true;
        self
    }

    /// Bound the number of worker threads used for the sweep.
    #[cfg(feature = "parallel")]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Run the sweep.
    ///
    /// `fit` builds and runs a clusterer for one candidate K; `score`
    /// grades the resulting partition. A non-finite score counts as a
    /// failure for that candidate.
    pub fn run<F, S>(&self, data: &[Vec<f32>], fit: F, score: S) -> SweepReport
    where
        F: Fn(usize, &[Vec<f32>]) -> Result<Partition> + Sync,
        S: Fn(&ScoreContext<'_>) -> f64 + Sync,
    {
        let pairwise = if self.precompute_pairwise {
            Some(pairwise_distances(data))
        } else {
            None
        };

        let run_one = |k: usize| -> std::result::Result<SweepRecord, SweepFailure> {
            let partition = fit(k, data).map_err(|error| SweepFailure { k, error })?;
            let ctx = ScoreContext {
                data,
                partition: &partition,
                pairwise: pairwise.as_ref(),
            };
            let score = score(&ctx);
            if !score.is_finite() {
                return Err(SweepFailure {
                    k,
                    error: Error::NumericInstability {
                        what: "non-finite score",
                    },
                });
            }
            Ok(SweepRecord {
                k,
                score,
                partition,
            })
        };

        // One slot per candidate, written exactly once; collect() keeps
        // candidate order regardless of completion order.
        #[cfg(feature = "parallel")]
        let outcomes: Vec<_> = match self.workers {
            Some(workers) => {
                match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                    Ok(pool) => {
                        pool.install(|| self.candidates.par_iter().map(|&k| run_one(k)).collect())
                    }
                    Err(_) => self.candidates.par_iter().map(|&k| run_one(k)).collect(),
                }
            }
            None => self.candidates.par_iter().map(|&k| run_one(k)).collect(),
        };

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<_> = self.candidates.iter().map(|&k| run_one(k)).collect();

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(failure) => failures.push(failure),
            }
        }

        // Stable sort: equal scores keep candidate order.
        match self.goal {
            Goal::Minimize => records.sort_by(|a, b| {
                a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal)
            }),
            Goal::Maximize => records.sort_by(|a, b| {
                b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
            }),
        }

        SweepReport { records, failures }
    }
}
