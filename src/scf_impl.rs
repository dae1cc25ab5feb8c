//! Self-consistent field iteration.
//!
//! The nonlinear map F (trial potential → next potential) is built from an
//! operator provider, a generalized eigensolver, the density accumulator and
//! the potential updater. The Broyden driver searches for p* = F(p*).

extern crate nalgebra as na;

pub mod broyden;
pub mod density;
pub mod potential;
pub mod record;
pub mod residual;
pub mod xc;

#[cfg(test)]
mod tests;

pub use broyden::{BroydenDriver, DriverState, MixingParams, ScfOutcome};
pub use density::{accumulate_density, Occupation};
pub use potential::{HartreeSolver, IdentityHartree, NoHartree, PoissonHartree, PotentialParts, PotentialUpdater};
pub use record::ConvergenceRecord;
pub use residual::{KohnShamMap, ScfObservables};
pub use xc::{NoXc, PerdewZunger, PowerLaw, SlaterExchange, XcFunctional};

use crate::eigen::GeneralizedEigensolver;
use crate::error::Result;
use crate::operators::OperatorProvider;
use na::DVector;

/// A map whose fixed point the driver searches for.
pub trait FixedPointMap {
    type Observables;

    /// Length of the trial vector.
    fn dimension(&self) -> usize;

    /// F(trial), plus whatever else the evaluation produced.
    fn apply(&self, trial: &DVector<f64>) -> Result<(DVector<f64>, Self::Observables)>;
}

/// Run the SCF loop from the zero potential.
pub fn run_scf<P, S>(map: &KohnShamMap<P, S>, params: MixingParams) -> Result<ScfOutcome<ScfObservables>>
where
    P: OperatorProvider,
    S: GeneralizedEigensolver,
{
    let seed = DVector::zeros(map.dimension());
    BroydenDriver::new(params).solve(map, seed)
}
