mod list;
mod run;

use std::process::ExitCode;

use anyhow::Context as _;
use repos_harness::config::HarnessConfig;

use crate::cli::{Cli, Commands, ConfigOverrides};

pub async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
	let config = load_config(cli.config.as_deref(), &cli.overrides)?;

	match cli.command {
		Commands::Run(args) => run::execute(config, args).await,
		Commands::List => list::execute(),
	}
}

/// Config file (or defaults), then flag and environment overrides, then validation.
pub fn load_config(path: Option<&std::path::Path>, overrides: &ConfigOverrides) -> anyhow::Result<HarnessConfig> {
	let mut config = match path {
		Some(path) => HarnessConfig::from_file(path)?,
		None => HarnessConfig::default(),
	};
	overrides.apply(&mut config);
	config.validate().context("configuration rejected")?;
	Ok(config)
}
