//! Effective potential from the density: Hartree solve plus pointwise xc.

extern crate nalgebra as na;

use super::xc::XcFunctional;
use crate::error::{Result, ScfError};
use crate::operators::{LinearChain, OperatorProvider};
use na::{Cholesky, DMatrix, DVector, Dyn};
use rayon::prelude::*;

/// One deterministic linear solve with the density as source term.
pub trait HartreeSolver {
    fn solve(&self, density: &DVector<f64>) -> Result<DVector<f64>>;
}

/// v_H = n. Toy response used to exercise the SCF loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHartree;

impl HartreeSolver for IdentityHartree {
    fn solve(&self, density: &DVector<f64>) -> Result<DVector<f64>> {
        Ok(density.clone())
    }
}

/// v_H = 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHartree;

impl HartreeSolver for NoHartree {
    fn solve(&self, density: &DVector<f64>) -> Result<DVector<f64>> {
        Ok(DVector::zeros(density.len()))
    }
}

/// −φ″ = 4π n on a [`LinearChain`] with φ = 0 at both ends.
///
/// Weak form K φ = 4π M n on the interior nodes; K is factorized once.
pub struct PoissonHartree {
    chain: LinearChain,
    stiffness: Cholesky<f64, Dyn>,
    mass: DMatrix<f64>,
}

impl PoissonHartree {
    pub fn new(chain: &LinearChain) -> Result<Self> {
        let stiffness = chain
            .laplacian()
            .cholesky()
            .ok_or_else(|| ScfError::LinearSolve("Poisson stiffness is not positive definite".into()))?;
        Ok(Self {
            chain: chain.clone(),
            stiffness,
            mass: chain.mass_matrix(),
        })
    }
}

impl HartreeSolver for PoissonHartree {
    fn solve(&self, density: &DVector<f64>) -> Result<DVector<f64>> {
        if density.len() != self.chain.dofs() {
            return Err(ScfError::Configuration(format!(
                "density has {} entries, the chain has {} dofs",
                density.len(),
                self.chain.dofs()
            )));
        }
        let source = &self.mass * self.chain.restrict(density) * (4.0 * std::f64::consts::PI);
        let phi = self.stiffness.solve(&source);
        Ok(self.chain.expand(phi.as_view()))
    }
}

/// The two additive parts of the next trial potential.
#[derive(Clone, Debug)]
pub struct PotentialParts {
    pub hartree: DVector<f64>,
    pub xc: DVector<f64>,
}

impl PotentialParts {
    pub fn total(&self) -> DVector<f64> {
        &self.hartree + &self.xc
    }
}

pub struct PotentialUpdater {
    pub hartree: Box<dyn HartreeSolver>,
    pub xc: Box<dyn XcFunctional>,
    pub spin_channel: usize,
}

impl PotentialUpdater {
    pub fn new(hartree: Box<dyn HartreeSolver>, xc: Box<dyn XcFunctional>) -> Self {
        Self {
            hartree,
            xc,
            spin_channel: 0,
        }
    }

    pub fn update(&self, density: &DVector<f64>) -> Result<PotentialParts> {
        let xc = self.xc_potential(density)?;
        let hartree = self.hartree.solve(density)?;
        if hartree.len() != density.len() {
            return Err(ScfError::Configuration(format!(
                "Hartree solve returned {} entries for a density of {}",
                hartree.len(),
                density.len()
            )));
        }
        Ok(PotentialParts { hartree, xc })
    }

    /// Negative or non-finite densities and non-finite xc values are fatal.
    pub fn xc_potential(&self, density: &DVector<f64>) -> Result<DVector<f64>> {
        let xc = self.xc.as_ref();
        let channel = self.spin_channel;
        let values = density
            .as_slice()
            .par_iter()
            .enumerate()
            .map(|(dof, &rho)| {
                if !rho.is_finite() || rho < 0.0 {
                    return Err(ScfError::NumericalDomain { dof, value: rho });
                }
                let v = xc.potential(rho, channel);
                if v.is_finite() {
                    Ok(v)
                } else {
                    Err(ScfError::NumericalDomain { dof, value: v })
                }
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(DVector::from_vec(values))
    }
}
