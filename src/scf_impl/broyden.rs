//! Broyden quasi-Newton driver for the fixed point p = F(p).
//!
//! Solves R(p) = F(p) − p = 0 with Broyden's second method: the inverse
//! Jacobian starts as −α·I (plain linear mixing) and receives a rank-one
//! secant update after every evaluation, kept as a limited history of
//! (u, v) pairs so that H = −α·I + Σ u vᵀ is never formed. A full history
//! restarts from −α·I.

extern crate nalgebra as na;

use super::record::ConvergenceRecord;
use super::FixedPointMap;
use crate::error::{Result, ScfError};
use na::DVector;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct MixingParams {
    /// Initial inverse Jacobian is −alpha · I.
    pub alpha: f64,
    /// Number of secant pairs kept.
    pub history: usize,
    /// Maximum number of evaluations of F.
    pub max_iter: usize,
    /// Convergence threshold on ‖F(p) − p‖₂.
    pub tolerance: f64,
}

impl Default for MixingParams {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            history: 8,
            max_iter: 50,
            tolerance: 1e-6,
        }
    }
}

impl MixingParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0) || !self.alpha.is_finite() {
            return Err(ScfError::Configuration(format!("mixing alpha must be positive, got {}", self.alpha)));
        }
        if self.max_iter == 0 {
            return Err(ScfError::Configuration("max_iter must be at least 1".into()));
        }
        if !(self.tolerance > 0.0) {
            return Err(ScfError::Configuration(format!("tolerance must be positive, got {}", self.tolerance)));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Initial,
    Iterating,
    Converged,
    MaxIterExceeded,
}

/// Converged fixed point together with the observables of the final evaluation.
#[derive(Clone, Debug)]
pub struct ScfOutcome<O> {
    pub potential: DVector<f64>,
    pub observables: O,
    pub record: ConvergenceRecord,
    pub residual_norm: f64,
}

/// Limited-memory inverse Jacobian H = −α·I + Σ uᵢ vᵢᵀ.
#[derive(Clone, Debug)]
struct InverseJacobian {
    alpha: f64,
    capacity: usize,
    pairs: Vec<(DVector<f64>, DVector<f64>)>,
}

impl InverseJacobian {
    fn new(alpha: f64, capacity: usize) -> Self {
        Self {
            alpha,
            capacity,
            pairs: Vec::with_capacity(capacity),
        }
    }

    fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut out = x * -self.alpha;
        for (u, v) in &self.pairs {
            out.axpy(v.dot(x), u, 1.0);
        }
        out
    }

    /// Secant condition H⁺ Δr = Δp.
    ///
    /// Every stored u was computed against all older pairs, so dropping a
    /// single pair would invalidate the rest. A full history restarts from
    /// −α·I before the new pair is added.
    fn update(&mut self, dp: &DVector<f64>, dr: &DVector<f64>) {
        if self.capacity == 0 {
            return;
        }
        let denom = dr.dot(dr);
        if !(denom > 1e-30) || !denom.is_finite() {
            warn!("Broyden update skipped (|dR|^2 = {:e}); restarting from linear mixing", denom);
            self.pairs.clear();
            return;
        }
        if self.pairs.len() == self.capacity {
            debug!("Broyden history full ({} pairs); restarting from linear mixing", self.capacity);
            self.pairs.clear();
        }
        let u = (dp - self.apply(dr)) / denom;
        self.pairs.push((u, dr.clone()));
    }
}

pub struct BroydenDriver {
    pub params: MixingParams,
}

impl BroydenDriver {
    pub fn new(params: MixingParams) -> Self {
        Self { params }
    }

    pub fn solve<M: FixedPointMap>(&self, map: &M, initial: DVector<f64>) -> Result<ScfOutcome<M::Observables>> {
        self.params.validate()?;
        if initial.len() != map.dimension() {
            return Err(ScfError::Configuration(format!(
                "initial vector has {} entries, the map expects {}",
                initial.len(),
                map.dimension()
            )));
        }

        let mut state = DriverState::Initial;
        debug!("driver state: {:?}", state);
        let mut jacobian = InverseJacobian::new(self.params.alpha, self.params.history);

        let mut p = initial;
        let (mut residual, mut observables, mut record) = step(map, &p, ConvergenceRecord::new())?;
        state = DriverState::Iterating;
        debug!("driver state: {:?}", state);

        loop {
            let norm = residual.norm();
            info!("SCF iteration {}: |F(p) - p| = {:.6e}", record.calls, norm);

            if norm < self.params.tolerance {
                state = DriverState::Converged;
                info!(
                    "SCF converged after {} evaluations ({:.2?} total), state {:?}",
                    record.calls,
                    record.total_time(),
                    state
                );
                return Ok(ScfOutcome {
                    potential: p,
                    observables,
                    record,
                    residual_norm: norm,
                });
            }
            if record.calls >= self.params.max_iter {
                state = DriverState::MaxIterExceeded;
                warn!("driver state: {:?}", state);
                return Err(ScfError::ScfNotConverged {
                    iterations: record.calls,
                    residual: norm,
                });
            }

            let dp = -jacobian.apply(&residual);
            let p_next = &p + &dp;
            let (residual_next, observables_next, record_next) = step(map, &p_next, record)?;

            jacobian.update(&dp, &(&residual_next - &residual));
            p = p_next;
            residual = residual_next;
            observables = observables_next;
            record = record_next;
        }
    }
}

/// One timed evaluation: R = F(p) − p. Failures are tagged with the index of
/// the evaluation and the last residual norm seen before it.
fn step<M: FixedPointMap>(
    map: &M,
    p: &DVector<f64>,
    record: ConvergenceRecord,
) -> Result<(DVector<f64>, M::Observables, ConvergenceRecord)> {
    let iteration = record.calls;
    let last_residual = record.last_residual();
    let abort = |source: ScfError| ScfError::Aborted {
        iteration,
        last_residual,
        source: Box::new(source),
    };

    let ((next, observables), record) = record.timed(|| map.apply(p)).map_err(abort)?;
    if next.len() != p.len() {
        return Err(abort(ScfError::Configuration(format!(
            "map returned {} entries for a trial vector of {}",
            next.len(),
            p.len()
        ))));
    }
    let residual = next - p;
    let record = record.with_residual(residual.norm());
    debug!(
        "evaluation {} took {:.2?}",
        record.calls,
        record.elapsed.last().copied().unwrap_or_default()
    );
    Ok((residual, observables, record))
}
