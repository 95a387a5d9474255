//! K-means clustering (Lloyd's algorithm).
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of
//! squares** (WCSS): assign each point to its nearest centroid, move each
//! centroid to the mean of its points, repeat. Both steps can only lower
//! WCSS, which is bounded below by 0, so the iteration converges.
//!
//! # Initialization
//!
//! Centroids start with k-means++: the first is a random point, each next
//! one is sampled with probability proportional to its squared distance
//! from the nearest centroid chosen so far. This spreads the initial
//! centroids and gives a provable O(log k) approximation to optimal WCSS.
//!
//! # Empty clusters
//!
//! A cluster that attracts zero points keeps its previous centroid
//! unchanged. The mean update would divide by zero; retaining the centroid
//! keeps WCSS monotone, where random reinitialization would not.
//!
//! # Ties
//!
//! A point equidistant from several centroids goes to the lowest-index one.
//!
//! # Restarts
//!
//! Lloyd's algorithm only finds a local optimum, and a single k-means++
//! draw can still land badly. [`Kmeans::with_restarts`] runs several
//! independently seeded initializations and keeps the run with the lowest
//! final WCSS.

use ndarray::{Array2, ArrayView2};
use rand::prelude::*;

use super::distance::{l1_diff, squared_to_centroid};
use super::engine::{run_to_convergence, ClusterState, IterativeStep, Partition, Run};
use super::traits::Clustering;
use super::{as_matrix, rng_from_seed};
use crate::error::{Error, Result};

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on L1 centroid movement.
    tol: f64,
    /// Random seed.
    seed: Option<u64>,
    /// Independently seeded runs; the lowest-WCSS one wins.
    restarts: usize,
    /// Record the WCSS after every iteration.
    trace_loss: bool,
}

/// Mutable state of one K-means run.
#[derive(Debug, Clone)]
pub struct KmeansState {
    centroids: Array2<f64>,
    labels: Vec<usize>,
    /// Points whose assignment changed in the last sweep.
    reassigned: usize,
}

impl KmeansState {
    /// Current hard assignment, one label per point.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            tol: 1e-4,
            seed: None,
            restarts: 1,
            trace_loss: false,
        }
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
    /// run with the lowest final WCSS (default 1). With a base seed set,
    /// restart r uses seed + r, so the whole ensemble is reproducible.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    /// Record the WCSS after every iteration into the partition's trace.
    pub fn with_loss_trace(mut self, trace: bool) -> Self {
        self.trace_loss = trace;
        self
    }

    /// Fit and return the full partition record.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<Partition> {
        self.fit_inspect(data, None)
    }

    /// Fit with an optional per-iteration diagnostic hook.
    ///
    /// The hook observes the iteration index and current state; it cannot
    /// affect the run.
    pub fn fit_inspect(
        &self,
        data: &[Vec<f32>],
        mut inspect: Option<&mut dyn FnMut(usize, &KmeansState)>,
    ) -> Result<Partition> {
        let matrix = as_matrix(data)?;
        let n = matrix.nrows();
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }

        let view = matrix.view();
        let mut run_once = |restart: u64| -> Result<Run<KmeansState>> {
            let mut rng = rng_from_seed(self.seed.map(|s| s.wrapping_add(restart)));
            let hook = match inspect.as_mut() {
                Some(hook) => Some(&mut **hook as &mut dyn FnMut(usize, &KmeansState)),
                None => None,
            };
            run_to_convergence(self, &view, self.max_iter, rng.as_mut(), self.trace_loss, hook)
        };

        // Best-of-R restarts by final WCSS. Strict `<` keeps the earliest
        // restart on ties, so a single restart behaves exactly as before.
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

        Ok(Partition {
            labels: run.state.labels,
            centroids: run.state.centroids,
            memberships: None,
            iterations: run.iterations,
            converged: run.converged,
            loss_trace: run.loss_trace,
        })
    }

    /// Initialize centroids using the k-means++ algorithm.
    fn init_centroids(&self, data: &ArrayView2<'_, f32>, rng: &mut dyn RngCore) -> Array2<f64> {
        let n = data.nrows();
        let d = data.ncols();
        let mut centroids = Array2::zeros((self.k, d));

        // First centroid: random point.
        let first = rng.random_range(0..n);
        for j in 0..d {
            centroids[[0, j]] = data[[first, j]] as f64;
        }

        // Remaining centroids: sampled proportional to squared distance
        // from the nearest centroid chosen so far.
        for i in 1..self.k {
            let mut distances: Vec<f64> = Vec::with_capacity(n);
            for p in 0..n {
                let point = data.row(p);
                let min_dist = (0..i)
                    .map(|c| squared_to_centroid(&point, &centroids.row(c)))
                    .fold(f64::MAX, f64::min);
                distances.push(min_dist);
            }

            let total: f64 = distances.iter().sum();
            let selected = if total == 0.0 {
                // All points coincide with existing centroids.
                rng.random_range(0..n)
            } else {
                let threshold = rng.random::<f64>() * total;
                let mut cumsum = 0.0;
                let mut selected = n - 1;
                for (p, &dist) in distances.iter().enumerate() {
                    cumsum += dist;
                    if cumsum >= threshold {
                        selected = p;
                        break;
                    }
                }
                selected
            };

            for j in 0..d {
                centroids[[i, j]] = data[[selected, j]] as f64;
            }
        }

        centroids
    }
}

impl ClusterState for KmeansState {
    fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    fn loss(&self, data: &ArrayView2<'_, f32>) -> f64 {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, &label)| squared_to_centroid(&data.row(i), &self.centroids.row(label)))
            .sum()
    }
}

impl IterativeStep for Kmeans {
    type State = KmeansState;

    fn initialize(
        &self,
        data: &ArrayView2<'_, f32>,
        rng: &mut dyn RngCore,
    ) -> Result<KmeansState> {
        let centroids = self.init_centroids(data, rng);
        Ok(KmeansState {
            centroids,
            labels: vec![0; data.nrows()],
            reassigned: data.nrows(),
        })
    }

    fn update(&self, data: &ArrayView2<'_, f32>, state: &mut KmeansState) -> Result<()> {
        let n = data.nrows();
        let d = data.ncols();

        // Assignment step. Strict `<` keeps the lowest index on ties.
        let mut reassigned = 0;
        for i in 0..n {
            let point = data.row(i);
            let mut best_cluster = 0;
            let mut best_dist = f64::MAX;
            for c in 0..self.k {
                let dist = squared_to_centroid(&point, &state.centroids.row(c));
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = c;
                }
            }
            if state.labels[i] != best_cluster {
                state.labels[i] = best_cluster;
                reassigned += 1;
            }
        }
        state.reassigned = reassigned;

        // Update step: each centroid moves to the mean of its points.
        let mut sums = Array2::<f64>::zeros((self.k, d));
        let mut counts = vec![0usize; self.k];
        for i in 0..n {
            let c = state.labels[i];
            for j in 0..d {
                sums[[c, j]] += data[[i, j]] as f64;
            }
            counts[c] += 1;
        }

        for c in 0..self.k {
            // Empty cluster: retain the previous centroid.
            if counts[c] > 0 {
                for j in 0..d {
                    state.centroids[[c, j]] = sums[[c, j]] / counts[c] as f64;
                }
            }
        }

        Ok(())
    }

    fn converged(&self, previous: &Array2<f64>, state: &KmeansState) -> bool {
        state.reassigned == 0 || l1_diff(previous, &state.centroids) < self.tol
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        self.fit(data).map(|partition| partition.labels)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kmeans_basic() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ];

        let kmeans = Kmeans::new(2).with_seed(42);
        let labels = kmeans.fit_predict(&data).unwrap();

        // Points 0,1 should be in same cluster, points 2,3 in another
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_kmeans_all_points_assigned() {
        // Property: every point gets exactly one label in [0, k)
        let data: Vec<Vec<f32>> = (0..50)
            .map(|i| vec![i as f32 * 0.1, (i % 5) as f32])
            .collect();

        let kmeans = Kmeans::new(5).with_seed(123);
        let labels = kmeans.fit_predict(&data).unwrap();

        assert_eq!(labels.len(), data.len());
        for &label in &labels {
            assert!(label < 5, "label {} out of range", label);
        }
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        // Edge case: k = n (each point its own cluster)
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];

        let kmeans = Kmeans::new(3).with_seed(42);
        let labels = kmeans.fit_predict(&data).unwrap();

        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ];

        let labels1 = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();
        let labels2 = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();

        assert_eq!(labels1, labels2, "same seed should give same result");
    }

    #[test]
    fn test_kmeans_empty_input_error() {
        let data: Vec<Vec<f32>> = vec![];
        let result = Kmeans::new(2).fit_predict(&data);
        assert!(result.is_err());
    }

    #[test]
    fn test_kmeans_k_larger_than_n_error() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let result = Kmeans::new(5).fit_predict(&data);
        assert!(matches!(
            result,
            Err(Error::InvalidClusterCount {
                requested: 5,
                n_items: 2
            })
        ));
    }

    #[test]
    fn test_kmeans_k_zero_error() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        assert!(Kmeans::new(0).fit_predict(&data).is_err());
    }

    #[test]
    fn test_kmeans_ragged_input_error() {
        let data = vec![vec![0.0, 0.0], vec![1.0]];
        assert!(matches!(
            Kmeans::new(1).fit_predict(&data),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_kmeans_empty_cluster_retains_centroid() {
        // One centroid sits far from every point and attracts none; the
        // update must keep it in place rather than divide by zero.
        let kmeans = Kmeans::new(2);
        let data = ndarray::array![[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let mut state = KmeansState {
            centroids: ndarray::array![[0.5, 0.5], [100.0, 100.0]],
            labels: vec![0; 3],
            reassigned: 3,
        };

        kmeans.update(&data.view(), &mut state).unwrap();

        assert_eq!(state.labels, vec![0, 0, 0]);
        assert_eq!(state.centroids.row(1).to_vec(), vec![100.0, 100.0]);
        assert!(state.centroids.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_kmeans_wcss_non_increasing() {
        let data: Vec<Vec<f32>> = (0..60)
            .map(|i| {
                let base = (i % 3) as f32 * 8.0;
                vec![base + (i as f32 * 0.61).sin(), base + (i as f32 * 0.37).cos()]
            })
            .collect();

        let partition = Kmeans::new(3)
            .with_seed(7)
            .with_loss_trace(true)
            .fit(&data)
            .unwrap();

        for pair in partition.loss_trace.windows(2) {
            assert!(
                pair[1] <= pair[0] + 1e-9,
                "WCSS increased: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    fn four_blobs() -> Vec<Vec<f32>> {
        let centers = [(0.0f32, 0.0f32), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        let mut data = Vec::with_capacity(100);
        for (b, &(cx, cy)) in centers.iter().enumerate() {
            for i in 0..25 {
                let t = (b * 25 + i) as f32;
                data.push(vec![
                    cx + (t * 0.73).sin() * 0.5,
                    cy + (t * 1.19).cos() * 0.5,
                ]);
            }
        }
        data
    }

    #[test]
    fn test_kmeans_separated_gaussians_recovered() {
        // 4 well-separated blobs of 25 points each; K=4 with restarts must
        // recover the grouping (up to label permutation) within the budget.
        // A single k-means++ draw can split a blob, so this goes best-of-8.
        let data = four_blobs();

        let partition = Kmeans::new(4)
            .with_seed(42)
            .with_max_iter(50)
            .with_restarts(8)
            .fit(&data)
            .unwrap();

        assert!(partition.converged);
        assert!(partition.iterations <= 50);

        // Each blob maps to one label, and the four labels are distinct.
        let mut blob_labels = Vec::new();
        for b in 0..4 {
            let block = &partition.labels[b * 25..(b + 1) * 25];
            assert!(
                block.iter().all(|&l| l == block[0]),
                "blob {} split across clusters",
                b
            );
            blob_labels.push(block[0]);
        }
        blob_labels.sort_unstable();
        blob_labels.dedup();
        assert_eq!(blob_labels.len(), 4);
    }

    #[test]
    fn test_kmeans_restarts_keep_lowest_wcss() {
        let data = four_blobs();

        let single = Kmeans::new(4)
            .with_seed(42)
            .with_loss_trace(true)
            .fit(&data)
            .unwrap();
        let multi = Kmeans::new(4)
            .with_seed(42)
            .with_restarts(8)
            .with_loss_trace(true)
            .fit(&data)
            .unwrap();

        // Restart 0 reuses the base seed, so the ensemble can only match
        // or beat the single run.
        let single_wcss = *single.loss_trace.last().unwrap();
        let multi_wcss = *multi.loss_trace.last().unwrap();
        assert!(
            multi_wcss <= single_wcss + 1e-9,
            "restarts raised WCSS: {} -> {}",
            single_wcss,
            multi_wcss
        );

        // The ensemble is reproducible from the base seed.
        let again = Kmeans::new(4)
            .with_seed(42)
            .with_restarts(8)
            .fit(&data)
            .unwrap();
        assert_eq!(multi.labels, again.labels);
    }

    #[test]
    fn test_kmeans_reports_budget_exhaustion() {
        let data: Vec<Vec<f32>> = (0..40)
            .map(|i| vec![(i as f32 * 1.37).sin() * 10.0, (i as f32 * 0.83).cos() * 10.0])
            .collect();

        // One iteration is not enough on scattered data with a tight tol.
        let partition = Kmeans::new(5)
            .with_seed(3)
            .with_max_iter(1)
            .with_tol(1e-12)
            .fit(&data)
            .unwrap();

        assert_eq!(partition.iterations, 1);
        assert!(!partition.converged);
        assert_eq!(partition.labels.len(), 40);
    }
}
