//! Tests for the SCF map and the Broyden driver

use super::*;
use crate::eigen::{EigenSolverPolicy, EigenpairSet, GeneralizedEigensolver};
use crate::error::ScfError;
use crate::operators::OperatorProvider;
use nalgebra::{DMatrix, DVector, DVectorView};
use std::cell::Cell;
use std::rc::Rc;

/// N grid points on (0, 1), finite-difference Laplacian, B = I, no boundary DOFs.
struct GridLaplacian {
    n: usize,
}

impl OperatorProvider for GridLaplacian {
    fn dofs(&self) -> usize {
        self.n
    }

    fn active_dofs(&self) -> usize {
        self.n
    }

    fn assemble_rhs(&self) -> DMatrix<f64> {
        DMatrix::identity(self.n, self.n)
    }

    fn assemble_lhs(&self, potential: &DVector<f64>) -> Result<DMatrix<f64>> {
        let h = 1.0 / (self.n + 1) as f64;
        let inv_h2 = 1.0 / (h * h);
        Ok(DMatrix::from_fn(self.n, self.n, |i, j| {
            if i == j {
                2.0 * inv_h2 + potential[i]
            } else if i.abs_diff(j) == 1 {
                -inv_h2
            } else {
                0.0
            }
        }))
    }

    fn expand(&self, reduced: DVectorView<f64>) -> DVector<f64> {
        reduced.into_owned()
    }
}

fn toy_updater() -> PotentialUpdater {
    PotentialUpdater::new(Box::new(IdentityHartree), Box::new(PowerLaw { c: 0.5 }))
}

fn toy_map(n: usize, k: usize, n_electron: usize) -> KohnShamMap<GridLaplacian, EigenSolverPolicy> {
    KohnShamMap::new(
        GridLaplacian { n },
        EigenSolverPolicy::default(),
        Some(k),
        Occupation::Lowest(n_electron),
        toy_updater(),
    )
    .unwrap()
}

#[test]
fn test_toy_scenario_converges() {
    let map = toy_map(50, 10, 5);
    let params = MixingParams::default();
    let tolerance = params.tolerance;
    let outcome = run_scf(&map, params).unwrap();

    assert!(outcome.record.calls <= 50);
    assert!(outcome.residual_norm < tolerance);

    let eigs = &outcome.observables.eigenpairs;
    assert_eq!(eigs.len(), 10);
    assert!(eigs.is_ascending());
    assert!(eigs.b_orthonormality_error(map.rhs()) < 1e-8);

    // Five unit-weight normalized states.
    let electrons: f64 = outcome.observables.density.sum();
    assert!((electrons - 5.0).abs() < 1e-8);
}

#[test]
fn test_fixed_point_is_idempotent() {
    let map = toy_map(50, 10, 5);
    let params = MixingParams::default();
    let tolerance = params.tolerance;
    let outcome = run_scf(&map, params).unwrap();

    let (again, _) = map.apply(&outcome.potential).unwrap();
    assert!((&again - &outcome.potential).norm() < tolerance);
}

#[test]
fn test_counter_and_timing_bookkeeping() {
    let map = toy_map(30, 6, 3);
    let outcome = run_scf(&map, MixingParams::default()).unwrap();
    let record = &outcome.record;

    assert!(record.calls >= 1);
    assert_eq!(record.elapsed.len(), record.calls);
    assert_eq!(record.residual_norms.len(), record.calls);
    assert!(record.elapsed.iter().all(|d| d.as_secs_f64() >= 0.0));
    assert_eq!(record.last_residual(), Some(outcome.residual_norm));
}

#[test]
fn test_density_nonnegative_at_every_iteration_result() {
    let map = toy_map(40, 8, 4);
    let outcome = run_scf(&map, MixingParams::default()).unwrap();
    assert!(outcome.observables.density.iter().all(|&x| x >= 0.0));
    let parts = &outcome.observables.potential;
    assert_eq!(parts.total(), &parts.hartree + &parts.xc);
}

#[test]
fn test_dense_path_when_all_eigenpairs_requested() {
    let map = KohnShamMap::new(
        GridLaplacian { n: 12 },
        EigenSolverPolicy::default(),
        None,
        Occupation::Lowest(2),
        toy_updater(),
    )
    .unwrap();
    assert_eq!(map.n_eigs(), 12);

    let outcome = run_scf(&map, MixingParams::default()).unwrap();
    let eigs = &outcome.observables.eigenpairs;
    assert_eq!(eigs.len(), 12);
    assert!(eigs.is_ascending());
}

#[test]
fn test_eigen_count_above_dimension_is_rejected() {
    let result = KohnShamMap::new(
        GridLaplacian { n: 8 },
        EigenSolverPolicy::default(),
        Some(9),
        Occupation::Lowest(2),
        toy_updater(),
    );
    assert!(matches!(result, Err(ScfError::Configuration(_))));
}

struct CountingHartree {
    calls: Rc<Cell<usize>>,
}

impl HartreeSolver for CountingHartree {
    fn solve(&self, density: &DVector<f64>) -> Result<DVector<f64>> {
        self.calls.set(self.calls.get() + 1);
        Ok(density.clone())
    }
}

#[test]
fn test_too_many_electrons_fails_before_any_potential() {
    let calls = Rc::new(Cell::new(0));
    let updater = PotentialUpdater::new(
        Box::new(CountingHartree { calls: calls.clone() }),
        Box::new(PowerLaw { c: 0.5 }),
    );
    let map = KohnShamMap::new(
        GridLaplacian { n: 50 },
        EigenSolverPolicy::default(),
        Some(10),
        Occupation::Lowest(12),
        updater,
    )
    .unwrap();

    let err = run_scf(&map, MixingParams::default()).unwrap_err();
    match &err {
        ScfError::Aborted { iteration, source, .. } => {
            assert_eq!(*iteration, 0);
            assert!(matches!(**source, ScfError::Configuration(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(calls.get(), 0);
}

/// Delegates to the real solver until `fail_at` calls have been made.
struct FlakyEigensolver {
    inner: EigenSolverPolicy,
    fail_at: usize,
    calls: Cell<usize>,
}

impl GeneralizedEigensolver for FlakyEigensolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>, k: usize) -> Result<EigenpairSet> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call >= self.fail_at {
            return Err(ScfError::EigenNotConverged {
                iterations: 500,
                residual: 1e-3,
            });
        }
        self.inner.solve(a, b, k)
    }
}

#[test]
fn test_eigensolver_failure_aborts_with_iteration_index() {
    let solver = FlakyEigensolver {
        inner: EigenSolverPolicy::default(),
        fail_at: 2,
        calls: Cell::new(0),
    };
    let map = KohnShamMap::new(
        GridLaplacian { n: 30 },
        solver,
        Some(6),
        Occupation::Lowest(3),
        toy_updater(),
    )
    .unwrap();

    let err = run_scf(&map, MixingParams::default()).unwrap_err();
    match &err {
        ScfError::Aborted {
            iteration,
            last_residual,
            source,
        } => {
            assert_eq!(*iteration, 2);
            assert!(last_residual.is_some());
            assert!(matches!(**source, ScfError::EigenNotConverged { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root_cause(), ScfError::EigenNotConverged { .. }));
}

/// F(x) = M x + c with a symmetric contraction M.
struct AffineMap {
    m: DMatrix<f64>,
    c: DVector<f64>,
}

impl FixedPointMap for AffineMap {
    type Observables = ();

    fn dimension(&self) -> usize {
        self.c.len()
    }

    fn apply(&self, trial: &DVector<f64>) -> Result<(DVector<f64>, ())> {
        Ok((&self.m * trial + &self.c, ()))
    }
}

fn affine_map(n: usize) -> AffineMap {
    let m = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            0.3
        } else if i.abs_diff(j) == 1 {
            -0.1
        } else {
            0.0
        }
    });
    let c = DVector::from_fn(n, |i, _| (i as f64).sin());
    AffineMap { m, c }
}

#[test]
fn test_broyden_solves_affine_fixed_point() {
    let n = 20;
    let map = affine_map(n);
    let outcome = BroydenDriver::new(MixingParams::default())
        .solve(&map, DVector::zeros(n))
        .unwrap();

    let identity = DMatrix::<f64>::identity(n, n);
    let exact = (identity - &map.m).lu().solve(&map.c).unwrap();
    assert!((&outcome.potential - exact).norm() < 1e-5);
}

#[test]
fn test_broyden_beats_linear_mixing() {
    let n = 20;
    let map = affine_map(n);
    let with_history = BroydenDriver::new(MixingParams::default())
        .solve(&map, DVector::zeros(n))
        .unwrap();
    let linear = BroydenDriver::new(MixingParams {
        history: 0,
        max_iter: 500,
        ..Default::default()
    })
    .solve(&map, DVector::zeros(n))
    .unwrap();
    assert!(with_history.record.calls < linear.record.calls);
}

#[test]
fn test_broyden_converges_past_a_full_history() {
    let n = 20;
    let map = affine_map(n);
    let params = MixingParams {
        history: 2,
        max_iter: 200,
        ..Default::default()
    };
    let history = params.history;
    let outcome = BroydenDriver::new(params).solve(&map, DVector::zeros(n)).unwrap();

    assert!(outcome.record.calls > history + 1);
    let identity = DMatrix::<f64>::identity(n, n);
    let exact = (identity - &map.m).lu().solve(&map.c).unwrap();
    assert!((&outcome.potential - exact).norm() < 1e-5);
}

struct Drift;

impl FixedPointMap for Drift {
    type Observables = ();

    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, trial: &DVector<f64>) -> Result<(DVector<f64>, ())> {
        Ok((trial.add_scalar(1.0), ()))
    }
}

#[test]
fn test_iteration_budget_is_fatal() {
    let params = MixingParams {
        max_iter: 5,
        ..Default::default()
    };
    let err = BroydenDriver::new(params).solve(&Drift, DVector::zeros(3)).unwrap_err();
    match err {
        ScfError::ScfNotConverged { iterations, residual } => {
            assert_eq!(iterations, 5);
            assert!((residual - 3.0_f64.sqrt()).abs() < 1e-12);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_initial_vector_length_is_checked() {
    let map = affine_map(4);
    let result = BroydenDriver::new(MixingParams::default()).solve(&map, DVector::zeros(3));
    assert!(matches!(result, Err(ScfError::Configuration(_))));
}
