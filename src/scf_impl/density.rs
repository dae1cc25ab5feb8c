//! Electron density from occupied eigenstates.

extern crate nalgebra as na;

use crate::eigen::EigenpairSet;
use crate::error::{Result, ScfError};
use na::{DVector, DVectorView};

/// How the lowest eigenstates are occupied.
#[derive(Clone, Debug, PartialEq)]
pub enum Occupation {
    /// The lowest `n` states with unit weight.
    Lowest(usize),
    /// Explicit per-state weights for the lowest `weights.len()` states.
    Weights(Vec<f64>),
}

impl Occupation {
    pub fn occupied_states(&self) -> usize {
        match self {
            Occupation::Lowest(n) => *n,
            Occupation::Weights(w) => w.len(),
        }
    }

    pub fn weight(&self, state: usize) -> f64 {
        match self {
            Occupation::Lowest(_) => 1.0,
            Occupation::Weights(w) => w[state],
        }
    }

    /// Total number of electrons described by the occupation.
    pub fn electron_count(&self) -> f64 {
        match self {
            Occupation::Lowest(n) => *n as f64,
            Occupation::Weights(w) => w.iter().sum(),
        }
    }

    pub fn validate(&self, available: usize) -> Result<()> {
        let occupied = self.occupied_states();
        if occupied > available {
            return Err(ScfError::Configuration(format!(
                "{occupied} occupied states requested but only {available} eigenpairs are computed"
            )));
        }
        if let Occupation::Weights(w) = self {
            if let Some((i, bad)) = w.iter().enumerate().find(|(_, x)| !x.is_finite() || **x < 0.0) {
                return Err(ScfError::Configuration(format!(
                    "occupation weight {i} must be finite and nonnegative, got {bad}"
                )));
            }
        }
        Ok(())
    }
}

/// n = Σ wᵢ (expand vᵢ)² over the occupied states.
///
/// `expand` maps a reduced eigenvector onto the full DOF space of length `dofs`.
pub fn accumulate_density<E>(
    eigenpairs: &EigenpairSet,
    occupation: &Occupation,
    dofs: usize,
    expand: E,
) -> Result<DVector<f64>>
where
    E: Fn(DVectorView<f64>) -> DVector<f64>,
{
    occupation.validate(eigenpairs.len())?;

    let mut density = DVector::zeros(dofs);
    for state in 0..occupation.occupied_states() {
        let phi = expand(eigenpairs.vectors.column(state));
        if phi.len() != dofs {
            return Err(ScfError::Configuration(format!(
                "expanded state has {} entries, expected {dofs}",
                phi.len()
            )));
        }
        density += phi.map(|x| x * x) * occupation.weight(state);
    }
    Ok(density)
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::DMatrix;

    fn identity_pairs(n: usize, k: usize) -> EigenpairSet {
        EigenpairSet {
            values: DVector::from_fn(k, |i, _| i as f64),
            vectors: DMatrix::from_fn(n, k, |i, j| if i == j { 1.0 } else { 0.0 }),
        }
    }

    #[test]
    fn test_unit_occupation() {
        let pairs = identity_pairs(4, 3);
        let n = accumulate_density(&pairs, &Occupation::Lowest(2), 4, |v| v.into_owned()).unwrap();
        assert_eq!(n.as_slice(), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_weighted_occupation() {
        let pairs = identity_pairs(3, 3);
        let occ = Occupation::Weights(vec![2.0, 0.5]);
        let n = accumulate_density(&pairs, &occ, 3, |v| v.into_owned()).unwrap();
        assert_eq!(n.as_slice(), &[2.0, 0.5, 0.0]);
        assert_eq!(occ.electron_count(), 2.5);
    }

    #[test]
    fn test_density_is_nonnegative_for_signed_vectors() {
        let pairs = EigenpairSet {
            values: DVector::from_vec(vec![0.0, 1.0]),
            vectors: DMatrix::from_column_slice(3, 2, &[-0.5, 0.3, -0.8, 0.7, -0.7, 0.1]),
        };
        let n = accumulate_density(&pairs, &Occupation::Lowest(2), 3, |v| v.into_owned()).unwrap();
        assert!(n.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn test_expansion_adds_boundary_dofs() {
        let pairs = identity_pairs(2, 2);
        let expand = |v: DVectorView<f64>| {
            let mut full = DVector::zeros(4);
            full.rows_mut(1, 2).copy_from(&v);
            full
        };
        let n = accumulate_density(&pairs, &Occupation::Lowest(1), 4, expand).unwrap();
        assert_eq!(n.as_slice(), &[0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_too_many_electrons_is_configuration_error() {
        let pairs = identity_pairs(5, 2);
        let err = accumulate_density(&pairs, &Occupation::Lowest(3), 5, |v| v.into_owned()).unwrap_err();
        assert!(matches!(err, ScfError::Configuration(_)));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let occ = Occupation::Weights(vec![1.0, -1.0]);
        assert!(occ.validate(4).is_err());
    }
}
