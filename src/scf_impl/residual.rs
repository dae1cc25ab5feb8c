//! The SCF map: trial potential → next potential.

extern crate nalgebra as na;

use super::density::{accumulate_density, Occupation};
use super::potential::{PotentialParts, PotentialUpdater};
use super::FixedPointMap;
use crate::eigen::{EigenpairSet, GeneralizedEigensolver};
use crate::error::{Result, ScfError};
use crate::operators::OperatorProvider;
use na::{DMatrix, DVector};
use std::time::Instant;
use tracing::{debug, info};

/// Everything one evaluation of the map produces besides the next potential.
#[derive(Clone, Debug)]
pub struct ScfObservables {
    pub eigenpairs: EigenpairSet,
    pub density: DVector<f64>,
    pub potential: PotentialParts,
}

/// Composes assembly, eigensolve, density and potential update.
///
/// B is assembled once in [`KohnShamMap::new`]; A is reassembled on every
/// call from the trial potential passed in.
pub struct KohnShamMap<P: OperatorProvider, S: GeneralizedEigensolver> {
    provider: P,
    rhs: DMatrix<f64>,
    eigensolver: S,
    n_eigs: usize,
    occupation: Occupation,
    updater: PotentialUpdater,
}

impl<P: OperatorProvider, S: GeneralizedEigensolver> KohnShamMap<P, S> {
    /// `n_eigs = None` requests every eigenpair (k = N).
    pub fn new(
        provider: P,
        eigensolver: S,
        n_eigs: Option<usize>,
        occupation: Occupation,
        updater: PotentialUpdater,
    ) -> Result<Self> {
        let n = provider.active_dofs();
        let n_eigs = n_eigs.unwrap_or(n);
        if n_eigs == 0 || n_eigs > n {
            return Err(ScfError::Configuration(format!(
                "requested {n_eigs} eigenpairs but the problem dimension is {n}"
            )));
        }

        info!("assembling rhs...");
        let start = Instant::now();
        let rhs = provider.assemble_rhs();
        info!("...done in {:.2?}", start.elapsed());

        Ok(Self {
            provider,
            rhs,
            eigensolver,
            n_eigs,
            occupation,
            updater,
        })
    }

    pub fn n_eigs(&self) -> usize {
        self.n_eigs
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn rhs(&self) -> &DMatrix<f64> {
        &self.rhs
    }
}

impl<P: OperatorProvider, S: GeneralizedEigensolver> FixedPointMap for KohnShamMap<P, S> {
    type Observables = ScfObservables;

    fn dimension(&self) -> usize {
        self.provider.dofs()
    }

    fn apply(&self, trial: &DVector<f64>) -> Result<(DVector<f64>, ScfObservables)> {
        let start = Instant::now();
        let lhs = self.provider.assemble_lhs(trial)?;
        debug!("lhs assembled in {:.2?}", start.elapsed());

        let eigenpairs = self.eigensolver.solve(&lhs, &self.rhs, self.n_eigs)?;
        debug!("eigenvalues: {:?}", eigenpairs.values.as_slice());

        let density = accumulate_density(&eigenpairs, &self.occupation, self.provider.dofs(), |v| {
            self.provider.expand(v)
        })?;
        let potential = self.updater.update(&density)?;
        let next = potential.total();

        Ok((
            next,
            ScfObservables {
                eigenpairs,
                density,
                potential,
            },
        ))
    }
}
