//! Post-processing of a converged SCF run into named output fields.

extern crate nalgebra as na;

use crate::error::{Result, ScfError};
use crate::operators::OperatorProvider;
use crate::scf_impl::ScfObservables;
use na::DVector;
use serde::{Deserialize, Serialize};

/// Geometric weighting applied to the density once, after convergence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityScaling {
    #[default]
    Unscaled,
    /// Multiply by r², the squared distance of each node from the origin
    /// reported by [`OperatorProvider::distances`].
    SquaredDistance,
}

impl DensityScaling {
    pub fn apply(&self, density: &DVector<f64>, distances: Option<&[f64]>) -> Result<DVector<f64>> {
        match self {
            DensityScaling::Unscaled => Ok(density.clone()),
            DensityScaling::SquaredDistance => {
                let r = distances.ok_or_else(|| {
                    ScfError::Configuration("r² density scaling needs node distances".into())
                })?;
                if r.len() != density.len() {
                    return Err(ScfError::Configuration(format!(
                        "{} distances for a density of {} entries",
                        r.len(),
                        density.len()
                    )));
                }
                Ok(DVector::from_fn(density.len(), |i, _| density[i] * r[i] * r[i]))
            }
        }
    }

    /// Name of the density field in the output bundle.
    pub fn field_name(&self) -> &'static str {
        match self {
            DensityScaling::Unscaled => "n",
            DensityScaling::SquaredDistance => "nr2",
        }
    }
}

/// Which eigenstates end up in the output.
///
/// `Some((first, last))` keeps states `0..=first` and the top `last` states;
/// `None` keeps all of them.
pub fn selected_states(n_states: usize, save: Option<(usize, usize)>) -> Vec<usize> {
    (0..n_states)
        .filter(|&ii| match save {
            Some((first, last)) => !(ii > first && ii + last < n_states),
            None => true,
        })
        .collect()
}

/// A named output field.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub values: DVector<f64>,
}

/// Fields ready to be written, plus the ascending eigenvalue list.
#[derive(Clone, Debug)]
pub struct FieldBundle {
    pub coordinates: Option<Vec<f64>>,
    pub states: Vec<Field>,
    pub density: Field,
    pub hartree: Field,
    pub xc: Field,
    pub eigenvalues: Vec<f64>,
}

impl FieldBundle {
    pub fn build<P: OperatorProvider>(
        provider: &P,
        observables: &ScfObservables,
        scaling: DensityScaling,
        save: Option<(usize, usize)>,
    ) -> Result<Self> {
        let coordinates = provider.coordinates();
        let eigs = &observables.eigenpairs;

        let states = selected_states(eigs.len(), save)
            .into_iter()
            .map(|ii| Field {
                name: format!("phi{ii:03}"),
                values: provider.expand(eigs.vectors.column(ii)),
            })
            .collect();

        let density = Field {
            name: scaling.field_name().to_string(),
            values: scaling.apply(&observables.density, provider.distances().as_deref())?,
        };

        Ok(FieldBundle {
            coordinates,
            states,
            density,
            hartree: Field {
                name: "vh".to_string(),
                values: observables.potential.hartree.clone(),
            },
            xc: Field {
                name: "vxc".to_string(),
                values: observables.potential.xc.clone(),
            },
            eigenvalues: eigs.values.iter().copied().collect(),
        })
    }

    /// All fields in output order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.states
            .iter()
            .chain([&self.density, &self.hartree, &self.xc])
    }
}
