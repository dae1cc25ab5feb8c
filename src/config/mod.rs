//! Configuration management for SCF runs
//!
//! YAML configuration structures with per-section defaults. Command-line
//! overrides live in [`Args`].

mod args;

pub use args::Args;

use crate::postprocess::DensityScaling;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainParams,
    #[serde(default)]
    pub scf_params: ScfParams,
    #[serde(default)]
    pub eigensolver: EigenParams,
    #[serde(default)]
    pub potential: PotentialParams,
    #[serde(default)]
    pub output: OutputParams,
}

/// 1D finite-element chain the problem is discretized on
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChainParams {
    pub n_elements: Option<usize>,
    pub length: Option<f64>,
    /// "consistent" or "lumped"
    pub mass: Option<String>,
    /// Harmonic confinement frequency ω (0 disables it)
    pub confinement: Option<f64>,
}

impl Default for ChainParams {
    fn default() -> Self {
        ChainParams {
            n_elements: Some(100),
            length: Some(10.0),
            mass: Some("consistent".to_string()),
            confinement: Some(1.0),
        }
    }
}

impl ChainParams {
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.n_elements.is_none() {
            self.n_elements = defaults.n_elements;
        }
        if self.length.is_none() {
            self.length = defaults.length;
        }
        if self.mass.is_none() {
            self.mass = defaults.mass;
        }
        if self.confinement.is_none() {
            self.confinement = defaults.confinement;
        }
        self
    }
}

/// SCF loop parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScfParams {
    /// Number of eigenpairs; absent means all of them (dense solve)
    pub n_eigs: Option<usize>,
    /// Lowest states occupied with unit weight
    pub n_electron: Option<usize>,
    /// Explicit occupation weights; take precedence over `n_electron`
    pub occupations: Option<Vec<f64>>,
    pub max_iter: Option<usize>,
    pub tolerance: Option<f64>,
    pub mixing_alpha: Option<f64>,
    /// Broyden history length
    pub history: Option<usize>,
}

impl Default for ScfParams {
    fn default() -> Self {
        ScfParams {
            n_eigs: None,
            n_electron: Some(5),
            occupations: None,
            max_iter: Some(50),
            tolerance: Some(1e-6),
            mixing_alpha: Some(0.4),
            history: Some(8),
        }
    }
}

impl ScfParams {
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.n_electron.is_none() {
            self.n_electron = defaults.n_electron;
        }
        if self.max_iter.is_none() {
            self.max_iter = defaults.max_iter;
        }
        if self.tolerance.is_none() {
            self.tolerance = defaults.tolerance;
        }
        if self.mixing_alpha.is_none() {
            self.mixing_alpha = defaults.mixing_alpha;
        }
        if self.history.is_none() {
            self.history = defaults.history;
        }
        self
    }
}

/// Partial (iterative) eigensolver parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EigenParams {
    pub tolerance: Option<f64>,
    pub max_iter: Option<usize>,
    pub extra_vectors: Option<usize>,
    pub shift: Option<f64>,
    pub seed: Option<u64>,
}

impl Default for EigenParams {
    fn default() -> Self {
        EigenParams {
            tolerance: Some(1e-12),
            max_iter: Some(500),
            extra_vectors: Some(8),
            shift: None,
            seed: Some(42),
        }
    }
}

impl EigenParams {
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.tolerance.is_none() {
            self.tolerance = defaults.tolerance;
        }
        if self.max_iter.is_none() {
            self.max_iter = defaults.max_iter;
        }
        if self.extra_vectors.is_none() {
            self.extra_vectors = defaults.extra_vectors;
        }
        if self.seed.is_none() {
            self.seed = defaults.seed;
        }
        self
    }
}

/// Potential update parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PotentialParams {
    /// "identity", "poisson" or "none"
    pub hartree: Option<String>,
    /// "pz", "slater", "power" or "none"
    pub xc: Option<String>,
    /// Coefficient c of the "power" kernel c·ρ^(1/3)
    pub xc_coefficient: Option<f64>,
    pub spin_channel: Option<usize>,
}

impl Default for PotentialParams {
    fn default() -> Self {
        PotentialParams {
            hartree: Some("identity".to_string()),
            xc: Some("pz".to_string()),
            xc_coefficient: Some(1.0),
            spin_channel: Some(0),
        }
    }
}

impl PotentialParams {
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.hartree.is_none() {
            self.hartree = defaults.hartree;
        }
        if self.xc.is_none() {
            self.xc = defaults.xc;
        }
        if self.xc_coefficient.is_none() {
            self.xc_coefficient = defaults.xc_coefficient;
        }
        if self.spin_channel.is_none() {
            self.spin_channel = defaults.spin_channel;
        }
        self
    }
}

/// Post-processing and output files
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputParams {
    /// Output file name trunk: `<trunk>.dat`, `<trunk>_eigs.txt`
    pub trunk: Option<String>,
    pub density_scaling: Option<DensityScaling>,
    /// Keep states `0..=save[0]` and the top `save[1]`; all when absent
    pub save: Option<[usize; 2]>,
}

impl Default for OutputParams {
    fn default() -> Self {
        OutputParams {
            trunk: Some("scf_out".to_string()),
            density_scaling: Some(DensityScaling::SquaredDistance),
            save: None,
        }
    }
}

impl OutputParams {
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.trunk.is_none() {
            self.trunk = defaults.trunk;
        }
        if self.density_scaling.is_none() {
            self.density_scaling = defaults.density_scaling;
        }
        self
    }

    pub fn save_range(&self) -> Option<(usize, usize)> {
        self.save.map(|[first, last]| (first, last))
    }
}

impl Config {
    /// Apply defaults to all configuration sections
    pub fn with_defaults(mut self) -> Self {
        self.chain = self.chain.with_defaults();
        self.scf_params = self.scf_params.with_defaults();
        self.eigensolver = self.eigensolver.with_defaults();
        self.potential = self.potential.with_defaults();
        self.output = self.output.with_defaults();
        self
    }

    /// Apply command-line overrides on top of the file values
    pub fn with_overrides(mut self, args: &Args) -> Self {
        if args.n_eigs.is_some() {
            self.scf_params.n_eigs = args.n_eigs;
        }
        if args.n_electron.is_some() {
            self.scf_params.n_electron = args.n_electron;
            self.scf_params.occupations = None;
        }
        if args.max_iter.is_some() {
            self.scf_params.max_iter = args.max_iter;
        }
        if args.tolerance.is_some() {
            self.scf_params.tolerance = args.tolerance;
        }
        if args.mixing_alpha.is_some() {
            self.scf_params.mixing_alpha = args.mixing_alpha;
        }
        if args.trunk.is_some() {
            self.output.trunk = args.trunk.clone();
        }
        self
    }
}
