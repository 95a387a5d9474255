//! Fuzzy C-Means clustering.
//!
//! Soft K-means: instead of one label per point, every point carries a
//! graded membership in every cluster, stored in a K×N matrix U whose
//! columns sum to 1. Centroids V and memberships U co-evolve in lock-step,
//! each iteration minimizing
//!
//! ```text
//! J(U, V) = Σᵢ Σₖ u_ki^m · ||xᵢ - vₖ||²
//! ```
//!
//! where the fuzziness exponent m > 1 controls how soft the boundaries
//! are. At m → 1⁺ memberships collapse toward 0/1 and the algorithm
//! degenerates into K-means; m = 1 itself divides by zero in the
//! membership update and is rejected up front.
//!
//! # One iteration
//!
//! 1. **V-update**: vₖ = Σᵢ u_ki^m xᵢ / Σᵢ u_ki^m (weighted power mean).
//!    A cluster whose weight sum vanishes keeps its previous centroid.
//! 2. **U-update**: u_ki = 1 / Σⱼ (d(xᵢ,vₖ)/d(xᵢ,vⱼ))^(2/(m−1)).
//!    A point sitting exactly on a centroid gets membership 1 there and 0
//!    elsewhere, short-circuiting the zero denominator. Columns are then
//!    renormalized to absorb floating-point drift.
//!
//! Both half-steps are non-increasing in J; convergence is declared when
//! the L1 movement of V between iterations falls below the tolerance.
//!
//! Like K-means, the iteration only finds a local optimum of J, and a bad
//! random U draw can leave two centroids in one cluster's territory.
//! [`FuzzyCMeans::with_restarts`] runs several independently seeded
//! initializations and keeps the run with the lowest final objective.
//!
//! # Outputs
//!
//! The fuzzy result (U and V) and the derived crisp result (argmax of
//! each U column) are exposed as distinct queries:
//! [`SoftClustering::fit_predict_proba`] vs [`Clustering::fit_predict`],
//! with [`FuzzyCMeans::fit`] returning both in one [`Partition`].

use log::{debug, log_enabled, Level};
use ndarray::{Array2, ArrayView2};
use rand::prelude::*;

use super::distance::{distance_to_centroid, l1_diff};
use super::engine::{run_to_convergence, ClusterState, IterativeStep, Partition, Run};
use super::traits::{Clustering, SoftClustering};
use super::{as_matrix, rng_from_seed};
use crate::error::{Error, Result};

/// A cluster whose total membership weight falls below this keeps its
/// previous centroid instead of dividing by (nearly) zero.
const WEIGHT_FLOOR: f64 = 1e-10;

/// Fuzzy C-Means clustering algorithm.
#[derive(Debug, Clone)]
pub struct FuzzyCMeans {
    /// Number of clusters.
    k: usize,
    /// Fuzziness exponent, must be > 1.
    m: f64,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on L1 centroid movement.
    tol: f64,
    /// Random seed.
    seed: Option<u64>,
    /// Independently seeded runs; the lowest-objective one wins.
    restarts: usize,
    /// Record the objective after every iteration.
    trace_loss: bool,
}

/// Mutable state of one Fuzzy C-Means run: centroids V and the membership
/// matrix U, always mutually consistent after an update.
#[derive(Debug, Clone)]
pub struct FcmState {
    centroids: Array2<f64>,
    /// K×N membership matrix; every column sums to 1.
    memberships: Array2<f64>,
    /// Fuzziness exponent, copied from the algorithm so the state can
    /// evaluate its own objective.
    m: f64,
}

impl FcmState {
    /// Current membership matrix (K×N).
    pub fn memberships(&self) -> &Array2<f64> {
        &self.memberships
    }
}

impl FuzzyCMeans {
    /// Create a new Fuzzy C-Means clusterer with the conventional m = 2.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            m: 2.0,
            max_iter: 100,
            tol: 1e-4,
            seed: None,
            restarts: 1,
            trace_loss: false,
        }
    }

    /// Set the fuzziness exponent (validated at fit time; must be > 1).
    pub fn with_fuzziness(mut self, m: f64) -> Self {
        self.m = m;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Run this many independently seeded initializations and keep the
    /// run with the lowest final objective (default 1). With a base seed
    /// set, restart r uses seed + r, so the ensemble is reproducible.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    /// Record the objective after every iteration into the trace.
    pub fn with_loss_trace(mut self, trace: bool) -> Self {
        self.trace_loss = trace;
        self
    }

    /// Fit and return the full partition record, memberships included.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<Partition> {
        self.fit_inspect(data, None)
    }

    /// Fit with an optional per-iteration diagnostic hook.
    pub fn fit_inspect(
        &self,
        data: &[Vec<f32>],
        mut inspect: Option<&mut dyn FnMut(usize, &FcmState)>,
    ) -> Result<Partition> {
        let matrix = as_matrix(data)?;
        let n = matrix.nrows();
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        if self.m <= 1.0 {
            return Err(Error::InvalidParameter {
                name: "m",
                message: "fuzziness exponent must be > 1",
            });
        }

        let view = matrix.view();
        let mut run_once = |restart: u64| -> Result<Run<FcmState>> {
            let mut rng = rng_from_seed(self.seed.map(|s| s.wrapping_add(restart)));
            let hook = match inspect.as_mut() {
                Some(hook) => Some(&mut **hook as &mut dyn FnMut(usize, &FcmState)),
                None => None,
            };
            run_to_convergence(self, &view, self.max_iter, rng.as_mut(), self.trace_loss, hook)
        };

        // Best-of-R restarts by final objective. Strict `<` keeps the
        // earliest restart on ties, so one restart behaves as before.
        let mut run = run_once(0)?;
        let mut best_loss = run.state.loss(&view);
        for restart in 1..self.restarts.max(1) as u64 {
            let candidate = run_once(restart)?;
            let loss = candidate.state.loss(&view);
            if loss < best_loss {
                best_loss = loss;
                run = candidate;
            }
        }

        let labels = crisp_labels(&run.state.memberships);
        Ok(Partition {
            labels,
            centroids: run.state.centroids,
            memberships: Some(run.state.memberships),
            iterations: run.iterations,
            converged: run.converged,
            loss_trace: run.loss_trace,
        })
    }

    /// V-update: every centroid becomes the u^m-weighted mean of all
    /// points. Clusters with vanishing weight keep their previous row.
    fn update_v(&self, data: &ArrayView2<'_, f32>, state: &mut FcmState) {
        let n = data.nrows();
        let d = data.ncols();

        for c in 0..self.k {
            let mut weight_sum = 0.0;
            let mut weighted = vec![0.0f64; d];
            for i in 0..n {
                let w = state.memberships[[c, i]].powf(self.m);
                weight_sum += w;
                for j in 0..d {
                    weighted[j] += w * data[[i, j]] as f64;
                }
            }

            if weight_sum > WEIGHT_FLOOR {
                for j in 0..d {
                    state.centroids[[c, j]] = weighted[j] / weight_sum;
                }
            }
        }
    }

    /// U-update: inverse distance-ratio memberships against the current
    /// centroids, columns renormalized to sum exactly to 1.
    fn update_u(&self, data: &ArrayView2<'_, f32>, state: &mut FcmState) {
        let n = data.nrows();
        let exponent = 2.0 / (self.m - 1.0);

        for i in 0..n {
            let point = data.row(i);
            let dists: Vec<f64> = (0..self.k)
                .map(|c| distance_to_centroid(&point, &state.centroids.row(c)))
                .collect();

            // A point sitting exactly on a centroid belongs there fully.
            if let Some(hit) = dists.iter().position(|&dist| dist == 0.0) {
                for c in 0..self.k {
                    state.memberships[[c, i]] = if c == hit { 1.0 } else { 0.0 };
                }
                continue;
            }

            for c in 0..self.k {
                let inv: f64 = dists
                    .iter()
                    .map(|&dj| (dists[c] / dj).powf(exponent))
                    .sum();
                state.memberships[[c, i]] = 1.0 / inv;
            }

            let sum: f64 = (0..self.k).map(|c| state.memberships[[c, i]]).sum();
            for c in 0..self.k {
                state.memberships[[c, i]] /= sum;
            }
        }
    }
}

/// Argmax over each membership column; ties keep the lowest index.
fn crisp_labels(memberships: &Array2<f64>) -> Vec<usize> {
    let (k, n) = (memberships.nrows(), memberships.ncols());
    (0..n)
        .map(|i| {
            let mut best = 0;
            let mut best_u = memberships[[0, i]];
            for c in 1..k {
                if memberships[[c, i]] > best_u {
                    best_u = memberships[[c, i]];
                    best = c;
                }
            }
            best
        })
        .collect()
}

impl ClusterState for FcmState {
    fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    fn loss(&self, data: &ArrayView2<'_, f32>) -> f64 {
        let (k, n) = (self.memberships.nrows(), data.nrows());
        let mut total = 0.0;
        for i in 0..n {
            let point = data.row(i);
            for c in 0..k {
                let dist = distance_to_centroid(&point, &self.centroids.row(c));
                total += self.memberships[[c, i]].powf(self.m) * dist * dist;
            }
        }
        total
    }
}

impl IterativeStep for FuzzyCMeans {
    type State = FcmState;

    fn initialize(
        &self,
        data: &ArrayView2<'_, f32>,
        rng: &mut dyn RngCore,
    ) -> Result<FcmState> {
        let n = data.nrows();
        let d = data.ncols();

        // Random memberships, each column normalized to sum to 1.
        let mut memberships = Array2::zeros((self.k, n));
        for i in 0..n {
            let mut sum = 0.0;
            for c in 0..self.k {
                let u = rng.random::<f64>();
                memberships[[c, i]] = u;
                sum += u;
            }
            if sum == 0.0 {
                for c in 0..self.k {
                    memberships[[c, i]] = 1.0 / self.k as f64;
                }
            } else {
                for c in 0..self.k {
                    memberships[[c, i]] /= sum;
                }
            }
        }

        // Derive V from U so the pair starts mutually consistent.
        let mut state = FcmState {
            centroids: Array2::zeros((self.k, d)),
            memberships,
            m: self.m,
        };
        self.update_v(data, &mut state);
        Ok(state)
    }

    fn update(&self, data: &ArrayView2<'_, f32>, state: &mut FcmState) -> Result<()> {
        self.update_v(data, state);
        if log_enabled!(Level::Debug) {
            debug!("loss after V-update: {:.6}", state.loss(data));
        }

        self.update_u(data, state);
        if log_enabled!(Level::Debug) {
            debug!("loss after U-update: {:.6}", state.loss(data));
        }

        if state.memberships.iter().any(|u| !u.is_finite()) {
            return Err(Error::NumericInstability {
                what: "non-finite membership",
            });
        }
        Ok(())
    }

    fn converged(&self, previous: &Array2<f64>, state: &FcmState) -> bool {
        l1_diff(previous, &state.centroids) < self.tol
    }
}

impl Clustering for FuzzyCMeans {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        self.fit(data).map(|partition| partition.labels)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

impl SoftClustering for FuzzyCMeans {
    fn fit_predict_proba(&self, data: &[Vec<f32>]) -> Result<Vec<Vec<f64>>> {
        let partition = self.fit(data)?;
        let memberships = match partition.memberships {
            Some(memberships) => memberships,
            None => {
                return Err(Error::Other(
                    "fuzzy fit produced no membership matrix".to_string(),
                ))
            }
        };

        // U is K×N; callers get one row per point.
        let (k, n) = (memberships.nrows(), memberships.ncols());
        Ok((0..n)
            .map(|i| (0..k).map(|c| memberships[[c, i]]).collect())
            .collect())
    }
}
