mod report;
mod runner;

pub use runner::{run_pipeline, ScfRun};

use self::report::report_summary;
use crate::config::{Args, Config};
use crate::io::{save_bundle, setup_output};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;
use tracing::info;

pub struct ScfApplication {
    args: Args,
    config: Config,
}

impl ScfApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config_file(&args.config_file)?.with_overrides(&args);
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref())?;
        info!("Reading configuration from: {}", self.args.config_file);
        info!("Configuration loaded:\n{:?}", self.config);

        let run = run_pipeline(&self.config)?;
        report_summary(&run);

        let trunk = self.config.output.trunk.as_deref().unwrap_or("scf_out");
        save_bundle(trunk, &run.bundle)?;
        Ok(())
    }
}

/// Read a YAML configuration and fill in defaults.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", path.display()))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}
