//! Generic run-to-convergence loop shared by the prototype clusterers.
//!
//! K-Means and Fuzzy C-Means differ only in how they place initial
//! centroids, what one refinement sweep does, and what "close enough"
//! means for consecutive centroid sets. The loop itself — snapshot,
//! update, count, check — is identical, so it lives here once and the
//! algorithms supply the three varying pieces through [`IterativeStep`].
//!
//! The loop owns the iteration budget. Exhausting it is **not** an error:
//! the run still returns its final state, with [`Run::converged`] set to
//! `false` so callers can tell a tolerance-met stop from a budget stop.
//!
//! Every accepted iteration is checked for non-finite centroids; a NaN or
//! infinity that slipped past the algorithms' own guards surfaces as
//! [`Error::NumericInstability`] instead of propagating silently.

use log::{debug, log_enabled, Level};
use ndarray::{Array2, ArrayView2};
use rand::RngCore;

use crate::error::{Error, Result};

/// Mutable state owned by one clustering run.
pub trait ClusterState {
    /// Current centroid set, one row per cluster.
    fn centroids(&self) -> &Array2<f64>;

    /// Objective value, for diagnostics and tracing only. Never drives
    /// control flow.
    fn loss(&self, data: &ArrayView2<'_, f32>) -> f64;
}

/// One iterative-refinement clustering algorithm.
///
/// Implementations provide initialization, a single refinement sweep, and
/// a movement-based convergence predicate; [`run_to_convergence`] drives
/// them. The iteration budget belongs to the loop, not to implementations.
pub trait IterativeStep {
    /// Per-run state (centroids plus any companion assignment structure).
    type State: ClusterState;

    /// Place initial centroids (and any companion structure) for `data`.
    ///
    /// The random source is explicit so runs are reproducible and can be
    /// executed in parallel without shared global state.
    fn initialize(
        &self,
        data: &ArrayView2<'_, f32>,
        rng: &mut dyn RngCore,
    ) -> Result<Self::State>;

    /// One refinement sweep over the data.
    fn update(&self, data: &ArrayView2<'_, f32>, state: &mut Self::State) -> Result<()>;

    /// Whether the change from `previous` centroids to the current state
    /// is small enough to stop.
    fn converged(&self, previous: &Array2<f64>, state: &Self::State) -> bool;
}

/// Raw outcome of [`run_to_convergence`], still carrying the algorithm's
/// full state.
#[derive(Debug, Clone)]
pub struct Run<S> {
    /// Final algorithm state.
    pub state: S,
    /// Iterations actually performed.
    pub iterations: usize,
    /// Whether the movement criterion was met before the budget ran out.
    pub converged: bool,
    /// Per-iteration objective values, empty unless tracing was requested.
    pub loss_trace: Vec<f64>,
}

/// Converged output of one clustering run, detached from algorithm
/// internals.
///
/// Crisp algorithms leave `memberships` as `None`; soft algorithms fill it
/// with a K×N matrix whose columns sum to 1 and derive `labels` from the
/// per-point argmax.
#[derive(Debug, Clone)]
pub struct Partition {
    /// One cluster label per input point.
    pub labels: Vec<usize>,
    /// Final centroid set, one row per cluster.
    pub centroids: Array2<f64>,
    /// Membership matrix (K×N) for soft algorithms.
    pub memberships: Option<Array2<f64>>,
    /// Iterations actually performed.
    pub iterations: usize,
    /// Whether the movement criterion was met before the budget ran out.
    pub converged: bool,
    /// Per-iteration objective values, empty unless tracing was requested.
    pub loss_trace: Vec<f64>,
}

/// Drive an [`IterativeStep`] until it converges or `max_iter` is reached.
///
/// `inspect`, when present, is called after every iteration with the
/// iteration index (1-based) and the current state; it is a read-only
/// diagnostic hook and cannot affect the run. `trace_loss` records the
/// objective after every iteration into [`Run::loss_trace`].
pub fn run_to_convergence<A: IterativeStep>(
    alg: &A,
    data: &ArrayView2<'_, f32>,
    max_iter: usize,
    rng: &mut dyn RngCore,
    trace_loss: bool,
    mut inspect: Option<&mut dyn FnMut(usize, &A::State)>,
) -> Result<Run<A::State>> {
    let mut state = alg.initialize(data, rng)?;
    check_finite(state.centroids())?;

    let mut iterations = 0;
    let mut converged = false;
    let mut loss_trace = Vec::new();

    while iterations < max_iter {
        let previous = state.centroids().clone();
        alg.update(data, &mut state)?;
        iterations += 1;

        check_finite(state.centroids())?;

        if trace_loss || log_enabled!(Level::Debug) {
            let loss = state.loss(data);
            debug!("({iterations:3}/{max_iter}) loss: {loss:.6}");
            if trace_loss {
                loss_trace.push(loss);
            }
        }

        if let Some(hook) = &mut inspect {
            hook(iterations, &state);
        }

        if alg.converged(&previous, &state) {
            converged = true;
            break;
        }
    }

    Ok(Run {
        state,
        iterations,
        converged,
        loss_trace,
    })
}

/// Reject a centroid matrix containing NaN or infinity.
fn check_finite(centroids: &Array2<f64>) -> Result<()> {
    if centroids.iter().any(|v| !v.is_finite()) {
        return Err(Error::NumericInstability {
            what: "non-finite centroid",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    /// Toy step: a single 1-D centroid halving its distance to zero each
    /// iteration. Converges once the movement drops below 0.1.
    struct Halving;

    struct HalvingState {
        centroids: Array2<f64>,
    }

    impl ClusterState for HalvingState {
        fn centroids(&self) -> &Array2<f64> {
            &self.centroids
        }

        fn loss(&self, _data: &ArrayView2<'_, f32>) -> f64 {
            self.centroids[[0, 0]].abs()
        }
    }

    impl IterativeStep for Halving {
        type State = HalvingState;

        fn initialize(
            &self,
            _data: &ArrayView2<'_, f32>,
            _rng: &mut dyn RngCore,
        ) -> crate::error::Result<HalvingState> {
            Ok(HalvingState {
                centroids: ndarray::array![[8.0]],
            })
        }

        fn update(
            &self,
            _data: &ArrayView2<'_, f32>,
            state: &mut HalvingState,
        ) -> crate::error::Result<()> {
            state.centroids[[0, 0]] /= 2.0;
            Ok(())
        }

        fn converged(&self, previous: &Array2<f64>, state: &HalvingState) -> bool {
            (previous[[0, 0]] - state.centroids[[0, 0]]).abs() < 0.1
        }
    }

    fn dummy_data() -> ndarray::Array2<f32> {
        ndarray::array![[0.0f32]]
    }

    #[test]
    fn test_stops_when_criterion_met() {
        let data = dummy_data();
        let mut rng = StdRng::seed_from_u64(0);
        let run = run_to_convergence(&Halving, &data.view(), 100, &mut rng, false, None).unwrap();

        // 8 → 4 → 2 → 1 → 0.5 → 0.25 → 0.125 → 0.0625; movement 0.0625 < 0.1.
        assert!(run.converged);
        assert_eq!(run.iterations, 7);
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let data = dummy_data();
        let mut rng = StdRng::seed_from_u64(0);
        let run = run_to_convergence(&Halving, &data.view(), 3, &mut rng, false, None).unwrap();

        assert!(!run.converged);
        assert_eq!(run.iterations, 3);
        assert_eq!(run.state.centroids[[0, 0]], 1.0);
    }

    #[test]
    fn test_loss_trace_records_every_iteration() {
        let data = dummy_data();
        let mut rng = StdRng::seed_from_u64(0);
        let run = run_to_convergence(&Halving, &data.view(), 3, &mut rng, true, None).unwrap();

        assert_eq!(run.loss_trace, vec![4.0, 2.0, 1.0]);
    }

    #[test]
    fn test_inspect_hook_sees_every_iteration() {
        let data = dummy_data();
        let mut rng = StdRng::seed_from_u64(0);
        let mut seen = Vec::new();
        let mut hook = |iter: usize, state: &HalvingState| {
            seen.push((iter, state.centroids[[0, 0]]));
        };

        run_to_convergence(&Halving, &data.view(), 3, &mut rng, false, Some(&mut hook)).unwrap();

        assert_eq!(seen, vec![(1, 4.0), (2, 2.0), (3, 1.0)]);
    }

    /// Step that immediately produces a NaN centroid.
    struct Poisoned;

    impl IterativeStep for Poisoned {
        type State = HalvingState;

        fn initialize(
            &self,
            _data: &ArrayView2<'_, f32>,
            _rng: &mut dyn RngCore,
        ) -> crate::error::Result<HalvingState> {
            Ok(HalvingState {
                centroids: ndarray::array![[0.0]],
            })
        }

        fn update(
            &self,
            _data: &ArrayView2<'_, f32>,
            state: &mut HalvingState,
        ) -> crate::error::Result<()> {
            state.centroids[[0, 0]] = f64::NAN;
            Ok(())
        }

        fn converged(&self, _previous: &Array2<f64>, _state: &HalvingState) -> bool {
            false
        }
    }

    #[test]
    fn test_non_finite_centroid_is_rejected() {
        let data = dummy_data();
        let mut rng = StdRng::seed_from_u64(0);
        let result = run_to_convergence(&Poisoned, &data.view(), 10, &mut rng, false, None);

        assert!(matches!(
            result,
            Err(crate::error::Error::NumericInstability { .. })
        ));
    }
}
