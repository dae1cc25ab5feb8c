use super::runner::ScfRun;
use tracing::info;

pub fn report_summary(run: &ScfRun) {
    let record = &run.outcome.record;
    info!("\nSCF converged after {} evaluations.", record.calls);
    info!("  Final residual: {:.3e}", run.outcome.residual_norm);
    info!("  Time in F: {:.2?}", record.total_time());

    info!("\nEigenvalues:");
    let occupied = run.occupation.occupied_states();
    for (i, value) in run.bundle.eigenvalues.iter().enumerate() {
        let weight = if i < occupied { run.occupation.weight(i) } else { 0.0 };
        info!("  Level {:>3}: {:+.10} (occupation {:.3})", i + 1, value, weight);
    }

    let density = &run.outcome.observables.density;
    info!("\nDensity: max {:.6e}, sum {:.6e}", density.max(), density.sum());
}
