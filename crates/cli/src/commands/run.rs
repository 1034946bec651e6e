use std::process::ExitCode;
use std::sync::Arc;

use repos_harness::PlaywrightEngine;
use repos_harness::config::HarnessConfig;
use repos_harness::runner::{Suite, select};
use repos_harness::scenarios;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::output::print_report;

pub async fn execute(config: HarnessConfig, args: RunArgs) -> anyhow::Result<ExitCode> {
	let all = scenarios::all()?;
	let selected = select(&all, args.filter.as_deref());
	if selected.is_empty() {
		anyhow::bail!("no scenario matches filter {:?}", args.filter.unwrap_or_default());
	}

	info!(
		target = "repos",
		base_url = %config.base_url,
		browser = %config.browser.kind,
		tests = selected.len(),
		"starting suite"
	);

	let engine = PlaywrightEngine::start().await?;
	let suite = Suite::new(Arc::new(config), Arc::new(engine));
	let report = suite.run(&selected).await;

	if let Err(e) = suite.shutdown().await {
		warn!(target = "repos", error = %e, "engine shutdown failed");
	}

	print_report(&report, args.format)?;
	Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
