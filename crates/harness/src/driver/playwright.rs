//! Playwright backend for the driver seam.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use playwright_rs::{BrowserContextOptions, GotoOptions, LaunchOptions, Playwright, WaitUntil};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::{BrowserInstance, Engine, LoadMilestone, PageHandle, SessionContext};
use crate::config::{BrowserKind, BrowserOptions};
use crate::error::{HarnessError, Result};

impl From<LoadMilestone> for WaitUntil {
	fn from(milestone: LoadMilestone) -> Self {
		match milestone {
			LoadMilestone::Load => WaitUntil::Load,
			LoadMilestone::DomContentLoaded => WaitUntil::DomContentLoaded,
			LoadMilestone::NetworkIdle => WaitUntil::NetworkIdle,
			LoadMilestone::Commit => WaitUntil::Commit,
		}
	}
}

/// Playwright driver server, shared by every browser launched in a run.
pub struct PlaywrightEngine {
	playwright: Mutex<Option<Playwright>>,
}

impl PlaywrightEngine {
	/// Starts the Playwright driver server.
	pub async fn start() -> Result<Self> {
		debug!(target = "repos", "starting Playwright...");
		let playwright = Playwright::launch().await.map_err(|e| HarnessError::BrowserLaunch(e.to_string()))?;
		Ok(Self {
			playwright: Mutex::new(Some(playwright)),
		})
	}
}

#[async_trait]
impl Engine for PlaywrightEngine {
	async fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserInstance>> {
		let guard = self.playwright.lock().await;
		let playwright = guard.as_ref().ok_or(HarnessError::Closed("Playwright engine"))?;

		let launch_options = LaunchOptions {
			headless: Some(options.headless),
			..Default::default()
		};
		debug!(target = "repos", browser = %options.kind, headless = options.headless, "launching browser");
		let browser = match options.kind {
			BrowserKind::Chromium => playwright.chromium().launch_with_options(launch_options).await,
			BrowserKind::Firefox => playwright.firefox().launch_with_options(launch_options).await,
			BrowserKind::Webkit => playwright.webkit().launch_with_options(launch_options).await,
		}
		.map_err(|e| HarnessError::BrowserLaunch(e.to_string()))?;

		Ok(Box::new(PlaywrightBrowser { browser }))
	}

	async fn shutdown(&self) -> Result<()> {
		let Some(playwright) = self.playwright.lock().await.take() else {
			return Ok(());
		};
		playwright.shutdown().await?;
		debug!(target = "repos", "Playwright engine stopped");
		Ok(())
	}
}

pub struct PlaywrightBrowser {
	browser: playwright_rs::Browser,
}

#[async_trait]
impl BrowserInstance for PlaywrightBrowser {
	async fn new_context(&self, base_url: &Url) -> Result<Box<dyn SessionContext>> {
		// relative navigations resolve against the instance under test
		let options = BrowserContextOptions::builder().base_url(base_url.to_string()).build();
		let context = self.browser.new_context_with_options(options).await?;
		Ok(Box::new(PlaywrightContext {
			context,
			base_url: base_url.clone(),
		}))
	}

	async fn close(&self) -> Result<()> {
		self.browser.close().await?;
		Ok(())
	}
}

pub struct PlaywrightContext {
	context: playwright_rs::BrowserContext,
	base_url: Url,
}

#[async_trait]
impl SessionContext for PlaywrightContext {
	fn base_url(&self) -> &Url {
		&self.base_url
	}

	async fn new_page(&self) -> Result<Arc<dyn PageHandle>> {
		let page = self.context.new_page().await?;
		Ok(Arc::new(PlaywrightPage { page }))
	}

	async fn close(&self) -> Result<()> {
		self.context.close().await?;
		Ok(())
	}
}

pub struct PlaywrightPage {
	page: playwright_rs::Page,
}

#[async_trait]
impl PageHandle for PlaywrightPage {
	fn url(&self) -> String {
		self.page.url()
	}

	async fn goto(&self, url: &str, milestone: LoadMilestone, timeout: Duration) -> Result<()> {
		let options = GotoOptions::new().timeout(timeout).wait_until(milestone.into());
		self.page.goto(url, Some(options)).await?;
		Ok(())
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		Ok(self.page.locator(selector).await.is_visible().await?)
	}

	async fn fill(&self, selector: &str, value: &str) -> Result<()> {
		self.page.locator(selector).await.fill(value, None).await?;
		Ok(())
	}

	async fn press(&self, selector: &str, key: &str) -> Result<()> {
		self.page.locator(selector).await.press(key, None).await?;
		Ok(())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		self.page.locator(selector).await.click(None).await?;
		Ok(())
	}

	async fn evaluate(&self, expression: &str) -> Result<String> {
		self.page
			.evaluate_value(expression)
			.await
			.map_err(|e| HarnessError::JsEval(e.to_string()))
	}

	async fn content(&self) -> Result<String> {
		Ok(self.page.content().await?)
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		Ok(self.page.screenshot(None).await?)
	}

	async fn close(&self) -> Result<()> {
		self.page.close().await?;
		Ok(())
	}
}
