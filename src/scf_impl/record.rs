//! Diagnostics threaded through the fixed-point driver.

use crate::error::{Result, ScfError};
use std::time::{Duration, Instant};

/// Call count, per-call wall time and residual-norm history.
///
/// Passed by value into each driver step and handed back updated; it never
/// feeds back into the physics.
#[derive(Clone, Debug, Default)]
pub struct ConvergenceRecord {
    pub calls: usize,
    pub elapsed: Vec<Duration>,
    pub residual_norms: Vec<f64>,
}

impl ConvergenceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one evaluation, counting it and timing it.
    pub fn timed<T, F>(mut self, evaluate: F) -> Result<(T, Self)>
    where
        F: FnOnce() -> Result<T>,
    {
        self.calls += 1;
        let start = Instant::now();
        let out = evaluate()?;
        let stop = Instant::now();
        let elapsed = elapsed_between(start, stop, self.calls)?;
        self.elapsed.push(elapsed);
        Ok((out, self))
    }

    pub fn with_residual(mut self, norm: f64) -> Self {
        self.residual_norms.push(norm);
        self
    }

    pub fn last_residual(&self) -> Option<f64> {
        self.residual_norms.last().copied()
    }

    pub fn total_time(&self) -> Duration {
        self.elapsed.iter().sum()
    }
}

/// `stop − start`, failing when the clock went backwards.
pub(crate) fn elapsed_between(start: Instant, stop: Instant, call: usize) -> Result<Duration> {
    stop.checked_duration_since(start)
        .ok_or(ScfError::ClockRollback { call })
}
