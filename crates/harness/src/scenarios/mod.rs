//! Scenario catalogue for the repos app.
//!
//! Each scenario is a caller of the fixtures: it asks for a page (or
//! nothing), drives the UI, and asserts on what it sees. Names are stable;
//! they become artifact file names.

mod app_enabled;
mod repository_access;

use std::time::Duration;

pub use app_enabled::{ReposAppEnabled, ReposAppInAppList};
pub use repository_access::{CreateFileInRepository, FilesAccessibleViaWebDav, NavigateIntoRepository, RepositoryAppearsInFiles};

use crate::config::HarnessConfig;
use crate::driver::{LoadMilestone, PageHandle};
use crate::error::Result;
use crate::js;
use crate::runner::Scenario;
use crate::wait::{poll_until, wait_for};

pub(crate) const FILES_PATH: &str = "apps/files/";
pub(crate) const APPS_PATH: &str = "settings/apps";

/// Every scenario, in run order.
pub fn all() -> Result<Vec<Box<dyn Scenario>>> {
	let scenarios: Vec<Box<dyn Scenario>> = vec![
		Box::new(ReposAppEnabled::new()?),
		Box::new(ReposAppInAppList::new()?),
		Box::new(RepositoryAppearsInFiles::new()?),
		Box::new(NavigateIntoRepository::new()?),
		Box::new(CreateFileInRepository::new()?),
		Box::new(FilesAccessibleViaWebDav::new()?),
	];
	Ok(scenarios)
}

/// Restricts a locator to its first match.
pub(crate) fn first(selector: &str) -> String {
	format!("{selector} >> nth=0")
}

/// Selectors that can match a folder row in the Files list, most specific first.
pub fn folder_selectors(name: &str) -> Vec<String> {
	let quoted = js::quote(name);
	vec![
		format!("[data-cy-files-list-row-name={quoted}]"),
		format!("a:has-text({quoted})"),
		format!("span:has-text({quoted})"),
	]
}

/// Navigates to `path` under the base URL.
pub(crate) async fn open(page: &dyn PageHandle, config: &HarnessConfig, path: &str, milestone: LoadMilestone) -> Result<()> {
	page.goto(&config.url(path), milestone, config.timeouts.page_load).await
}

/// Opens the Files app and waits until the application chrome is rendered.
pub(crate) async fn open_files(page: &dyn PageHandle, config: &HarnessConfig) -> Result<()> {
	open(page, config, FILES_PATH, LoadMilestone::DomContentLoaded).await?;
	let marker = config.selectors.readiness_marker.as_str();
	wait_for(marker, config.timeouts.readiness, config.poll, || page.is_visible(marker)).await
}

/// First selector of `selectors` that becomes visible within `step` each.
pub(crate) async fn first_visible(
	page: &dyn PageHandle,
	config: &HarnessConfig,
	selectors: &[String],
	step: Duration,
) -> Option<String> {
	for selector in selectors {
		let selector = first(selector);
		let found = wait_for(&selector, step, config.poll, || page.is_visible(&selector)).await;
		if found.is_ok() {
			return Some(selector);
		}
	}
	None
}

/// Clicks the first element whose text contains `text`. Returns whether one was found.
pub(crate) async fn click_by_text(page: &dyn PageHandle, text: &str) -> Result<bool> {
	let script = format!(
		"(() => {{ const el = Array.from(document.querySelectorAll('a, span, div')).find(e => (e.textContent || '').includes({})); \
		if (el) {{ el.click(); return true; }} return false; }})()",
		js::quote(text)
	);
	Ok(js::truthy(&page.evaluate(&script).await?))
}

/// Waits for the URL to move away from `before`. Returns the final URL either way.
pub(crate) async fn settle_navigation(page: &dyn PageHandle, config: &HarnessConfig, before: &str) -> String {
	let moved = poll_until("url change", config.timeouts.settle, config.poll, || async move {
		let now = page.url();
		Ok((now != before).then_some(now))
	})
	.await;
	moved.unwrap_or_else(|_| page.url())
}
