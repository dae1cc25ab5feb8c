//! Local exchange-correlation kernels.
//!
//! Each kernel is a pointwise function of the local density. `spin_channel`
//! 0 is the unpolarized case; channels 1 and 2 treat the density as the
//! density of a single, fully polarized spin channel.

/// Pointwise xc potential v_xc(ρ). Must be defined for every ρ ≥ 0.
pub trait XcFunctional: Sync {
    fn potential(&self, density: f64, spin_channel: usize) -> f64;
}

#[inline]
fn slater_coefficient() -> f64 {
    -(3.0 / std::f64::consts::PI).powf(1.0 / 3.0)
}

/// Slater (LDA) exchange: v_x = −(3/π)^(1/3) ρ^(1/3).
#[derive(Clone, Copy, Debug, Default)]
pub struct SlaterExchange;

impl XcFunctional for SlaterExchange {
    fn potential(&self, density: f64, spin_channel: usize) -> f64 {
        if density <= 0.0 {
            return 0.0;
        }
        let rho = if spin_channel == 0 { density } else { 2.0 * density };
        slater_coefficient() * rho.powf(1.0 / 3.0)
    }
}

/// Perdew–Zunger (1981) parameterization of the correlation potential.
struct PzParams {
    gamma: f64,
    beta1: f64,
    beta2: f64,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

const PZ_UNPOLARIZED: PzParams = PzParams {
    gamma: -0.1423,
    beta1: 1.0529,
    beta2: 0.3334,
    a: 0.0311,
    b: -0.048,
    c: 0.0020,
    d: -0.0116,
};

const PZ_POLARIZED: PzParams = PzParams {
    gamma: -0.0843,
    beta1: 1.3981,
    beta2: 0.2611,
    a: 0.01555,
    b: -0.0269,
    c: 0.0007,
    d: -0.0048,
};

fn pz_correlation_potential(rho: f64, p: &PzParams) -> f64 {
    if rho <= 0.0 {
        return 0.0;
    }
    let rs = (3.0 / (4.0 * std::f64::consts::PI * rho)).powf(1.0 / 3.0);
    if rs >= 1.0 {
        let sq = rs.sqrt();
        let denom = 1.0 + p.beta1 * sq + p.beta2 * rs;
        let ec = p.gamma / denom;
        ec * (1.0 + 7.0 / 6.0 * p.beta1 * sq + 4.0 / 3.0 * p.beta2 * rs) / denom
    } else {
        let ln_rs = rs.ln();
        p.a * ln_rs + (p.b - p.a / 3.0) + 2.0 / 3.0 * p.c * rs * ln_rs + (2.0 * p.d - p.c) / 3.0 * rs
    }
}

/// Slater exchange plus Perdew–Zunger correlation (LDA-PZ).
#[derive(Clone, Copy, Debug, Default)]
pub struct PerdewZunger;

impl XcFunctional for PerdewZunger {
    fn potential(&self, density: f64, spin_channel: usize) -> f64 {
        let params = if spin_channel == 0 { &PZ_UNPOLARIZED } else { &PZ_POLARIZED };
        SlaterExchange.potential(density, spin_channel) + pz_correlation_potential(density, params)
    }
}

/// c · ρ^(1/3), a single-parameter toy kernel.
#[derive(Clone, Copy, Debug)]
pub struct PowerLaw {
    pub c: f64,
}

impl XcFunctional for PowerLaw {
    fn potential(&self, density: f64, _spin_channel: usize) -> f64 {
        self.c * density.cbrt()
    }
}

/// No exchange-correlation term.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoXc;

impl XcFunctional for NoXc {
    fn potential(&self, _density: f64, _spin_channel: usize) -> f64 {
        0.0
    }
}
