//! Self-consistent eigenstate solver, command-line entry point
//!
//! Reads a YAML configuration, iterates the potential to self-consistency
//! and writes the fields and eigenvalues.

use color_eyre::eyre::Result;
use fem_scf::app::ScfApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    ScfApplication::from_cli()?.run()
}
