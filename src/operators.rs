//! Operator assembly for the generalized eigenproblem A v = λ B v.
//!
//! The SCF core only talks to [`OperatorProvider`]. The trial potential is an
//! explicit argument of [`OperatorProvider::assemble_lhs`], so assembling A
//! never depends on state left behind by a previous evaluation.

extern crate nalgebra as na;

use crate::error::{Result, ScfError};
use na::{DMatrix, DVector, DVectorView};

pub trait OperatorProvider {
    /// Length of the full field vectors (state, density, potential).
    fn dofs(&self) -> usize;

    /// Dimension of the eigenproblem (unconstrained DOFs).
    fn active_dofs(&self) -> usize;

    /// Mass-like operator B. Independent of the potential; assembled once per run.
    fn assemble_rhs(&self) -> DMatrix<f64>;

    /// Stiffness-like operator A for the given trial potential (length `dofs()`).
    fn assemble_lhs(&self, potential: &DVector<f64>) -> Result<DMatrix<f64>>;

    /// Expand a reduced (active) vector into the full DOF space.
    fn expand(&self, reduced: DVectorView<f64>) -> DVector<f64>;

    /// Node coordinates, one per full DOF, if the discretization has any.
    fn coordinates(&self) -> Option<Vec<f64>> {
        None
    }

    /// Distance r of every full DOF from the physical origin, used for r²
    /// density weighting. Defaults to the coordinates themselves.
    fn distances(&self) -> Option<Vec<f64>> {
        self.coordinates().map(|x| x.into_iter().map(f64::abs).collect())
    }
}

/// Mass matrix flavour of [`LinearChain`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MassKind {
    Consistent,
    Lumped,
}

/// Uniform 1D linear finite elements on [0, L] with homogeneous Dirichlet ends.
///
/// Full DOFs are the `n_elements + 1` nodes, active DOFs the interior nodes.
/// A = ½∫φ′ᵢφ′ⱼ + ∫(v_ext + v) φᵢφⱼ, where the potential term is lumped onto
/// the nodes and v_ext = ½ω²(x − L/2)² is an optional harmonic confinement.
#[derive(Clone, Debug)]
pub struct LinearChain {
    pub n_elements: usize,
    pub length: f64,
    pub mass: MassKind,
    pub confinement: f64,
}

impl LinearChain {
    pub fn new(n_elements: usize, length: f64) -> Result<Self> {
        if n_elements < 2 {
            return Err(ScfError::Configuration(format!(
                "a chain needs at least 2 elements, got {n_elements}"
            )));
        }
        if !(length > 0.0) {
            return Err(ScfError::Configuration(format!(
                "chain length must be positive, got {length}"
            )));
        }
        Ok(Self {
            n_elements,
            length,
            mass: MassKind::Consistent,
            confinement: 0.0,
        })
    }

    pub fn with_mass(mut self, mass: MassKind) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_confinement(mut self, omega: f64) -> Self {
        self.confinement = omega;
        self
    }

    pub fn spacing(&self) -> f64 {
        self.length / self.n_elements as f64
    }

    fn node(&self, i: usize) -> f64 {
        i as f64 * self.spacing()
    }

    /// ∫φ′ᵢφ′ⱼ over the interior nodes (no ½ factor).
    pub fn laplacian(&self) -> DMatrix<f64> {
        let n = self.active_dofs();
        let h = self.spacing();
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                2.0 / h
            } else if i.abs_diff(j) == 1 {
                -1.0 / h
            } else {
                0.0
            }
        })
    }

    /// ∫φᵢφⱼ over the interior nodes.
    pub fn mass_matrix(&self) -> DMatrix<f64> {
        let n = self.active_dofs();
        let h = self.spacing();
        match self.mass {
            MassKind::Consistent => DMatrix::from_fn(n, n, |i, j| {
                if i == j {
                    4.0 * h / 6.0
                } else if i.abs_diff(j) == 1 {
                    h / 6.0
                } else {
                    0.0
                }
            }),
            MassKind::Lumped => DMatrix::from_diagonal_element(n, n, h),
        }
    }

    /// Restrict a full nodal field to the interior nodes.
    pub fn restrict(&self, full: &DVector<f64>) -> DVector<f64> {
        full.rows(1, self.active_dofs()).into_owned()
    }
}

impl OperatorProvider for LinearChain {
    fn dofs(&self) -> usize {
        self.n_elements + 1
    }

    fn active_dofs(&self) -> usize {
        self.n_elements - 1
    }

    fn assemble_rhs(&self) -> DMatrix<f64> {
        self.mass_matrix()
    }

    fn assemble_lhs(&self, potential: &DVector<f64>) -> Result<DMatrix<f64>> {
        if potential.len() != self.dofs() {
            return Err(ScfError::Configuration(format!(
                "potential has {} entries, the chain has {} dofs",
                potential.len(),
                self.dofs()
            )));
        }
        let h = self.spacing();
        let centre = 0.5 * self.length;
        let mut a = self.laplacian() * 0.5;
        for i in 0..self.active_dofs() {
            let x = self.node(i + 1);
            let v_ext = 0.5 * self.confinement * self.confinement * (x - centre).powi(2);
            a[(i, i)] += h * (v_ext + potential[i + 1]);
        }
        Ok(a)
    }

    fn expand(&self, reduced: DVectorView<f64>) -> DVector<f64> {
        let mut full = DVector::zeros(self.dofs());
        full.rows_mut(1, self.active_dofs()).copy_from(&reduced);
        full
    }

    fn coordinates(&self) -> Option<Vec<f64>> {
        Some((0..self.dofs()).map(|i| self.node(i)).collect())
    }

    /// Measured from the centre of the confining well at L/2.
    fn distances(&self) -> Option<Vec<f64>> {
        let centre = 0.5 * self.length;
        Some((0..self.dofs()).map(|i| (self.node(i) - centre).abs()).collect())
    }
}
