use crate::config::Config;
use crate::eigen::{EigenSolverPolicy, SubspaceEigensolver};
use crate::operators::{LinearChain, MassKind};
use crate::postprocess::{DensityScaling, FieldBundle};
use crate::scf_impl::{
    run_scf, HartreeSolver, IdentityHartree, KohnShamMap, MixingParams, NoHartree, NoXc, Occupation,
    PerdewZunger, PoissonHartree, PotentialUpdater, PowerLaw, ScfObservables, ScfOutcome, SlaterExchange,
    XcFunctional,
};
use color_eyre::eyre::{bail, Result, WrapErr};
use tracing::info;

/// A converged run and its post-processed fields.
pub struct ScfRun {
    pub outcome: ScfOutcome<ScfObservables>,
    pub bundle: FieldBundle,
    pub occupation: Occupation,
}

/// Build every component from the configuration, iterate to self-consistency
/// and post-process the result. Writes no files.
pub fn run_pipeline(config: &Config) -> Result<ScfRun> {
    let chain = build_chain(config)?;
    info!(
        "Chain: {} elements on [0, {}], {} interior nodes",
        chain.n_elements,
        chain.length,
        chain.n_elements - 1
    );

    let updater = build_updater(config, &chain)?;
    let occupation = build_occupation(config);
    let eigensolver = build_eigensolver(config);
    let params = mixing_params(config);
    params.validate()?;

    let map = KohnShamMap::new(
        chain,
        eigensolver,
        config.scf_params.n_eigs,
        occupation.clone(),
        updater,
    )
    .wrap_err("Failed to set up the SCF map")?;
    info!(
        "Solving for {} eigenpairs, {} electrons",
        map.n_eigs(),
        occupation.electron_count()
    );

    let outcome = run_scf(&map, params).wrap_err("SCF iteration failed")?;

    let scaling = config.output.density_scaling.unwrap_or(DensityScaling::SquaredDistance);
    let bundle = FieldBundle::build(
        map.provider(),
        &outcome.observables,
        scaling,
        config.output.save_range(),
    )
    .wrap_err("Post-processing failed")?;

    Ok(ScfRun {
        outcome,
        bundle,
        occupation,
    })
}

fn build_chain(config: &Config) -> Result<LinearChain> {
    let params = &config.chain;
    let mass = match params.mass.as_deref().unwrap_or("consistent").to_lowercase().as_str() {
        "consistent" => MassKind::Consistent,
        "lumped" => MassKind::Lumped,
        other => bail!("Unknown mass matrix kind: {other}"),
    };
    let chain = LinearChain::new(params.n_elements.unwrap_or(100), params.length.unwrap_or(10.0))?
        .with_mass(mass)
        .with_confinement(params.confinement.unwrap_or(0.0));
    Ok(chain)
}

fn build_updater(config: &Config, chain: &LinearChain) -> Result<PotentialUpdater> {
    let params = &config.potential;

    let hartree: Box<dyn HartreeSolver> =
        match params.hartree.as_deref().unwrap_or("identity").to_lowercase().as_str() {
            "identity" => Box::new(IdentityHartree),
            "poisson" => Box::new(PoissonHartree::new(chain)?),
            "none" => Box::new(NoHartree),
            other => bail!("Unknown Hartree solver: {other}"),
        };

    let xc: Box<dyn XcFunctional> = match params.xc.as_deref().unwrap_or("pz").to_lowercase().as_str() {
        "pz" | "perdew_zunger" => Box::new(PerdewZunger),
        "slater" => Box::new(SlaterExchange),
        "power" => Box::new(PowerLaw {
            c: params.xc_coefficient.unwrap_or(1.0),
        }),
        "none" => Box::new(NoXc),
        other => bail!("Unknown exchange-correlation kernel: {other}"),
    };

    let spin_channel = params.spin_channel.unwrap_or(0);
    if spin_channel > 2 {
        bail!("spin_channel must be 0, 1 or 2, got {spin_channel}");
    }

    let mut updater = PotentialUpdater::new(hartree, xc);
    updater.spin_channel = spin_channel;
    Ok(updater)
}

fn build_occupation(config: &Config) -> Occupation {
    match &config.scf_params.occupations {
        Some(weights) => Occupation::Weights(weights.clone()),
        None => Occupation::Lowest(config.scf_params.n_electron.unwrap_or(5)),
    }
}

fn build_eigensolver(config: &Config) -> EigenSolverPolicy {
    let params = &config.eigensolver;
    let defaults = SubspaceEigensolver::default();
    EigenSolverPolicy::new(SubspaceEigensolver {
        tolerance: params.tolerance.unwrap_or(defaults.tolerance),
        max_iter: params.max_iter.unwrap_or(defaults.max_iter),
        extra_vectors: params.extra_vectors.unwrap_or(defaults.extra_vectors),
        shift: params.shift,
        seed: params.seed.unwrap_or(defaults.seed),
    })
}

fn mixing_params(config: &Config) -> MixingParams {
    let params = &config.scf_params;
    let defaults = MixingParams::default();
    MixingParams {
        alpha: params.mixing_alpha.unwrap_or(defaults.alpha),
        history: params.history.unwrap_or(defaults.history),
        max_iter: params.max_iter.unwrap_or(defaults.max_iter),
        tolerance: params.tolerance.unwrap_or(defaults.tolerance),
    }
}
