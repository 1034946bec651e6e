use anyhow::anyhow;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{APPS_PATH, FILES_PATH, open};
use crate::driver::LoadMilestone;
use crate::error::Result;
use crate::js;
use crate::runner::{Fixtures, Needs, Scenario, Verdict};
use crate::test_id::QualifiedName;
use crate::wait::poll_until;

/// The Files app loads for the logged-in user.
pub struct ReposAppEnabled {
	name: QualifiedName,
}

impl ReposAppEnabled {
	pub fn new() -> Result<Self> {
		Ok(Self {
			name: QualifiedName::parse("app_enabled::repos_app_enabled")?,
		})
	}
}

#[async_trait]
impl Scenario for ReposAppEnabled {
	fn name(&self) -> &QualifiedName {
		&self.name
	}

	fn needs(&self) -> Needs {
		Needs::Page
	}

	fn description(&self) -> &str {
		"Files app is reachable with the authenticated session"
	}

	async fn run(&self, fx: &Fixtures<'_>) -> anyhow::Result<Verdict> {
		let page = fx.page()?;
		open(page, fx.config(), FILES_PATH, LoadMilestone::NetworkIdle).await?;

		let url = page.url();
		anyhow::ensure!(url.contains("/apps/files/"), "Not on the files page: {url}");
		Ok(Verdict::Passed)
	}
}

/// Row of the app management list that mentions repositories.
#[derive(Debug, Deserialize)]
struct AppRow {
	present: bool,
	enabled: bool,
}

const APP_ROW_SCRIPT: &str = "JSON.stringify((() => { \
	for (const row of document.querySelectorAll('.app-list .app-item, [class*=\"app-row\"]')) { \
		const text = (row.textContent || '').toLowerCase(); \
		if (text.includes('repositor')) return { present: true, enabled: text.includes('disable') }; \
	} \
	return { present: false, enabled: false }; })())";

/// The repos app is listed on the app management page.
pub struct ReposAppInAppList {
	name: QualifiedName,
}

impl ReposAppInAppList {
	pub fn new() -> Result<Self> {
		Ok(Self {
			name: QualifiedName::parse("app_enabled::repos_app_in_app_list")?,
		})
	}
}

#[async_trait]
impl Scenario for ReposAppInAppList {
	fn name(&self) -> &QualifiedName {
		&self.name
	}

	fn needs(&self) -> Needs {
		Needs::Page
	}

	fn description(&self) -> &str {
		"Repos app appears in the app management list"
	}

	async fn run(&self, fx: &Fixtures<'_>) -> anyhow::Result<Verdict> {
		let page = fx.page()?;
		let config = fx.config();
		open(page, config, APPS_PATH, LoadMilestone::NetworkIdle).await?;

		// The list renders client-side after network idle.
		let row = poll_until("repos app row", config.timeouts.readiness, config.poll, || async move {
			let row: AppRow = js::decode(&page.evaluate(APP_ROW_SCRIPT).await?)?;
			Ok(row.present.then_some(row))
		})
		.await
		.map_err(|_| anyhow!("Repos app not found in the app list"))?;

		debug!(target = "repos", enabled = row.enabled, "repos app row found");
		Ok(Verdict::Passed)
	}
}
