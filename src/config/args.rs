//! Command-line argument parsing for SCF runs

use clap::Parser;

/// Self-consistent eigenstates of a finite-element Schrödinger problem
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "demos/chain.yaml")]
    pub config_file: String,

    /// Log file (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override the number of eigenpairs
    #[arg(long)]
    pub n_eigs: Option<usize>,

    /// Override the number of unit-occupied states
    #[arg(long)]
    pub n_electron: Option<usize>,

    /// Override the maximum number of SCF evaluations
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Override the SCF residual tolerance
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Override the Broyden mixing parameter
    #[arg(long)]
    pub mixing_alpha: Option<f64>,

    /// Override the output file name trunk
    #[arg(short, long)]
    pub trunk: Option<String>,
}
