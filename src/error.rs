//! Typed errors for the SCF core.
//!
//! Every variant is fatal: the core never catches and suppresses a failure.
//! The fixed-point driver wraps evaluation failures in [`ScfError::Aborted`]
//! so the caller learns which iteration failed and how far the run had got.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScfError {
    /// Inconsistent problem setup (eigen-count, occupation, vector lengths).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Density outside the domain of the xc kernel, or a non-finite xc value.
    #[error("numerical domain error at dof {dof}: density/potential value {value:e}")]
    NumericalDomain { dof: usize, value: f64 },

    #[error("eigensolve did not converge after {iterations} iterations (max residual {residual:.3e})")]
    EigenNotConverged { iterations: usize, residual: f64 },

    #[error("linear solve failed: {0}")]
    LinearSolve(String),

    #[error("SCF did not converge within {iterations} evaluations (last residual norm {residual:.3e})")]
    ScfNotConverged { iterations: usize, residual: f64 },

    /// A timing sample came out negative, so the measurement cannot be trusted.
    #[error("clock went backwards while timing evaluation {call}")]
    ClockRollback { call: usize },

    #[error("SCF aborted at iteration {iteration} (last residual norm {})", fmt_residual(.last_residual))]
    Aborted {
        iteration: usize,
        last_residual: Option<f64>,
        #[source]
        source: Box<ScfError>,
    },
}

fn fmt_residual(residual: &Option<f64>) -> String {
    match residual {
        Some(r) => format!("{r:.3e}"),
        None => "n/a".to_string(),
    }
}

impl ScfError {
    /// The innermost error, skipping any `Aborted` wrappers.
    pub fn root_cause(&self) -> &ScfError {
        match self {
            ScfError::Aborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScfError>;
