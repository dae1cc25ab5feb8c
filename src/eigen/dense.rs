//! Exact dense generalized eigensolve.
//!
//! B = L Lᵀ (Cholesky), C = L⁻¹ A L⁻ᵀ, C y = λ y, v = L⁻ᵀ y.
//! The back-transformed eigenvectors are B-orthonormal by construction.

extern crate nalgebra as na;

use super::{align_eigenvectors, check_request, sort_ascending, EigenpairSet, GeneralizedEigensolver};
use crate::error::{Result, ScfError};
use na::DMatrix;

#[derive(Clone, Copy, Debug, Default)]
pub struct DenseEigensolver;

impl GeneralizedEigensolver for DenseEigensolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>, k: usize) -> Result<EigenpairSet> {
        check_request(a, b, k)?;

        let chol = b
            .clone()
            .cholesky()
            .ok_or_else(|| ScfError::LinearSolve("mass operator is not positive definite".into()))?;
        let l = chol.l();

        let half = l
            .solve_lower_triangular(a)
            .ok_or_else(|| ScfError::LinearSolve("singular Cholesky factor".into()))?;
        let reduced = l
            .solve_lower_triangular(&half.transpose())
            .ok_or_else(|| ScfError::LinearSolve("singular Cholesky factor".into()))?;
        // Round-off leaves C slightly asymmetric.
        let reduced = (&reduced + reduced.transpose()) * 0.5;

        let eig = reduced.symmetric_eigen();
        if eig.eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(ScfError::LinearSolve("non-finite eigenvalue in dense solve".into()));
        }
        let (values, y) = sort_ascending(&eig.eigenvalues, &eig.eigenvectors);

        let vectors = l
            .transpose()
            .solve_upper_triangular(&y)
            .ok_or_else(|| ScfError::LinearSolve("singular Cholesky factor".into()))?;

        Ok(EigenpairSet {
            values,
            vectors: align_eigenvectors(vectors),
        }
        .truncated(k))
    }
}
