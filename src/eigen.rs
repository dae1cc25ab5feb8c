//! Generalized symmetric eigensolvers for A v = λ B v.
//!
//! Two strategies sit behind [`GeneralizedEigensolver`]: an exact dense solve
//! of all eigenpairs and a partial iterative solve of the lowest k. Which one
//! runs is a performance decision ([`EigenStrategy::select`]); both return the
//! same ascending, B-orthonormal eigenpairs.

extern crate nalgebra as na;

mod dense;
mod subspace;

pub use dense::DenseEigensolver;
pub use subspace::SubspaceEigensolver;

use crate::error::{Result, ScfError};
use na::{DMatrix, DVector};
use tracing::debug;

/// Lowest eigenpairs of a generalized problem, ascending by eigenvalue.
///
/// Column `j` of `vectors` belongs to `values[j]`; columns are B-orthonormal.
#[derive(Clone, Debug)]
pub struct EigenpairSet {
    pub values: DVector<f64>,
    pub vectors: DMatrix<f64>,
}

impl EigenpairSet {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep only the lowest `k` pairs.
    pub fn truncated(self, k: usize) -> Self {
        let k = k.min(self.len());
        EigenpairSet {
            values: self.values.rows(0, k).into_owned(),
            vectors: self.vectors.columns(0, k).into_owned(),
        }
    }

    /// max |vᵢᵀ B vⱼ − δᵢⱼ|
    pub fn b_orthonormality_error(&self, b: &DMatrix<f64>) -> f64 {
        let gram = self.vectors.transpose() * b * &self.vectors;
        let mut worst = 0.0_f64;
        for i in 0..gram.nrows() {
            for j in 0..gram.ncols() {
                let target = if i == j { 1.0 } else { 0.0 };
                worst = worst.max((gram[(i, j)] - target).abs());
            }
        }
        worst
    }

    pub fn is_ascending(&self) -> bool {
        self.values.as_slice().windows(2).all(|w| w[0] <= w[1])
    }
}

pub trait GeneralizedEigensolver {
    /// The `k` lowest eigenpairs of A v = λ B v, ascending.
    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>, k: usize) -> Result<EigenpairSet>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EigenStrategy {
    /// All N eigenpairs, exact.
    Dense,
    /// Lowest k < N eigenpairs, iterative.
    Partial,
}

impl EigenStrategy {
    /// Dense when every eigenpair is wanted, partial otherwise.
    pub fn select(k: usize, n: usize) -> Self {
        if k == n {
            EigenStrategy::Dense
        } else {
            EigenStrategy::Partial
        }
    }
}

/// Dispatches each request to the dense or the partial strategy.
#[derive(Clone, Debug, Default)]
pub struct EigenSolverPolicy {
    pub dense: DenseEigensolver,
    pub partial: SubspaceEigensolver,
}

impl EigenSolverPolicy {
    pub fn new(partial: SubspaceEigensolver) -> Self {
        Self {
            dense: DenseEigensolver,
            partial,
        }
    }
}

impl GeneralizedEigensolver for EigenSolverPolicy {
    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>, k: usize) -> Result<EigenpairSet> {
        check_request(a, b, k)?;
        let strategy = EigenStrategy::select(k, a.nrows());
        debug!("eigensolve: {:?} strategy for {} of {}", strategy, k, a.nrows());
        match strategy {
            EigenStrategy::Dense => self.dense.solve(a, b, k),
            EigenStrategy::Partial => self.partial.solve(a, b, k),
        }
    }
}

pub(crate) fn check_request(a: &DMatrix<f64>, b: &DMatrix<f64>, k: usize) -> Result<()> {
    let n = a.nrows();
    if !a.is_square() || a.shape() != b.shape() {
        return Err(ScfError::Configuration(format!(
            "operator shapes do not match: A is {:?}, B is {:?}",
            a.shape(),
            b.shape()
        )));
    }
    if k == 0 || k > n {
        return Err(ScfError::Configuration(format!(
            "requested {k} eigenpairs from a problem of dimension {n}"
        )));
    }
    Ok(())
}

/// Flip each eigenvector so that its largest-magnitude entry is positive.
pub fn align_eigenvectors(mut eigvecs: DMatrix<f64>) -> DMatrix<f64> {
    for j in 0..eigvecs.ncols() {
        let max_val = eigvecs
            .column(j)
            .iter()
            .copied()
            .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
        if max_val < 0.0 {
            eigvecs.column_mut(j).neg_mut();
        }
    }
    eigvecs
}

/// Sort eigenvalues ascending and reorder the eigenvector columns to match.
pub(crate) fn sort_ascending(values: &DVector<f64>, vectors: &DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    use std::cmp::Ordering;
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
    });
    let sorted_values = DVector::from_fn(values.len(), |i, _| values[indices[i]]);
    let sorted_vectors = vectors.select_columns(&indices);
    (sorted_values, sorted_vectors)
}

#[cfg(test)]
pub(crate) mod test_problems {
    use super::*;

    /// Tridiagonal Laplacian scaled by 1/h² plus a diagonal potential, with a
    /// consistent-mass-like B. Small and well separated.
    pub fn laplacian_pair(n: usize, potential: impl Fn(usize) -> f64) -> (DMatrix<f64>, DMatrix<f64>) {
        let h = 1.0 / (n + 1) as f64;
        let a = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                2.0 / (h * h) + potential(i)
            } else if i.abs_diff(j) == 1 {
                -1.0 / (h * h)
            } else {
                0.0
            }
        });
        let b = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                4.0 / 6.0
            } else if i.abs_diff(j) == 1 {
                1.0 / 6.0
            } else {
                0.0
            }
        });
        (a, b)
    }
}
