//! Partial eigensolve: shifted inverse block subspace iteration.
//!
//! Each sweep applies (A − σB)⁻¹ B to a block of p > k vectors and performs a
//! Rayleigh–Ritz projection with the dense solver. σ lies below the spectrum,
//! so the block converges to the lowest eigenpairs. The lowest k Ritz pairs
//! are accepted once the backward error
//! ‖A x − λ B x‖ / ((‖A‖ + |λ| ‖B‖) ‖x‖) is below `tolerance` for each of
//! them (Frobenius norms). The test does not change when A and B are scaled
//! together.

extern crate nalgebra as na;

use super::{check_request, DenseEigensolver, EigenpairSet, GeneralizedEigensolver};
use crate::error::{Result, ScfError};
use na::{DMatrix, DVectorView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct SubspaceEigensolver {
    pub tolerance: f64,
    pub max_iter: usize,
    /// Guard vectors carried beyond k; the block is max(2k, k + extra_vectors).
    pub extra_vectors: usize,
    /// Spectral shift σ. Estimated from Gershgorin discs when `None`.
    pub shift: Option<f64>,
    pub seed: u64,
}

impl Default for SubspaceEigensolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iter: 500,
            extra_vectors: 8,
            shift: None,
            seed: 42,
        }
    }
}

impl SubspaceEigensolver {
    fn block_size(&self, k: usize, n: usize) -> usize {
        (2 * k).max(k + self.extra_vectors).min(n)
    }
}

impl GeneralizedEigensolver for SubspaceEigensolver {
    fn solve(&self, a: &DMatrix<f64>, b: &DMatrix<f64>, k: usize) -> Result<EigenpairSet> {
        check_request(a, b, k)?;
        let n = a.nrows();
        let p = self.block_size(k, n);

        let sigma = match self.shift {
            Some(s) => s,
            None => gershgorin_shift(a, b)?,
        };
        let factor = (a - b * sigma).cholesky().ok_or_else(|| {
            ScfError::LinearSolve(format!("A - {sigma:.6e} B is not positive definite; shift is not below the spectrum"))
        })?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut block = DMatrix::from_fn(n, p, |_, _| rng.gen_range(-0.5..0.5));
        let mut worst = f64::INFINITY;
        let (a_norm, b_norm) = (a.norm(), b.norm());

        for iter in 1..=self.max_iter {
            let mut z = factor.solve(&(b * &block));
            for mut col in z.column_iter_mut() {
                let norm = col.norm();
                if norm > 0.0 {
                    col /= norm;
                }
            }

            let zt = z.transpose();
            let ar = &zt * a * &z;
            let br = &zt * b * &z;
            let ar = (&ar + ar.transpose()) * 0.5;
            let br = (&br + br.transpose()) * 0.5;
            let ritz = DenseEigensolver.solve(&ar, &br, p)?;

            block = &z * &ritz.vectors;
            worst = (0..k)
                .map(|j| {
                    let x = block.column(j);
                    let lambda = ritz.values[j];
                    backward_error(a, b, a_norm, b_norm, x, lambda)
                })
                .fold(0.0_f64, f64::max);

            if worst <= self.tolerance {
                debug!("subspace iteration converged in {} sweeps (residual {:.3e})", iter, worst);
                return Ok(EigenpairSet {
                    values: ritz.values,
                    vectors: block,
                }
                .truncated(k));
            }
        }

        Err(ScfError::EigenNotConverged {
            iterations: self.max_iter,
            residual: worst,
        })
    }
}

/// ‖A x − λ B x‖ / ((‖A‖ + |λ| ‖B‖) ‖x‖)
fn backward_error(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    a_norm: f64,
    b_norm: f64,
    x: DVectorView<f64>,
    lambda: f64,
) -> f64 {
    let r = a * x - (b * x) * lambda;
    let scale = (a_norm + lambda.abs() * b_norm) * x.norm();
    if scale > 0.0 {
        r.norm() / scale
    } else {
        r.norm()
    }
}

/// A shift strictly below the smallest generalized eigenvalue.
///
/// With Gershgorin bounds a_lo ≤ vᵀAv/vᵀv and b_lo ≤ vᵀBv/vᵀv ≤ b_hi,
/// λ_min ≥ a_lo/b_hi when a_lo ≥ 0 and λ_min ≥ a_lo/b_lo otherwise.
fn gershgorin_shift(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<f64> {
    let (a_lo, _) = gershgorin_bounds(a);
    let (b_lo, b_hi) = gershgorin_bounds(b);
    if b_lo <= 0.0 {
        return Err(ScfError::Configuration(
            "cannot bound the spectrum of a mass operator that is not diagonally dominant; set an explicit shift".into(),
        ));
    }
    let lower = if a_lo >= 0.0 { a_lo / b_hi } else { a_lo / b_lo };
    Ok(lower - 0.1 * (lower.abs() + 1.0))
}

fn gershgorin_bounds(m: &DMatrix<f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (i, row) in m.row_iter().enumerate() {
        let radius: f64 = row
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, v)| v.abs())
            .sum();
        lo = lo.min(m[(i, i)] - radius);
        hi = hi.max(m[(i, i)] + radius);
    }
    (lo, hi)
}
