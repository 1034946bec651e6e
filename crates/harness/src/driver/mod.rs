//! Browser driver seam.
//!
//! The fixtures only talk to these traits. [`playwright`] provides the real
//! backend; tests plug in scripted implementations.

pub mod playwright;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::BrowserOptions;
use crate::error::Result;

/// Navigation milestone a `goto` waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMilestone {
	Load,
	#[default]
	DomContentLoaded,
	NetworkIdle,
	Commit,
}

impl std::fmt::Display for LoadMilestone {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			LoadMilestone::Load => write!(f, "load"),
			LoadMilestone::DomContentLoaded => write!(f, "domcontentloaded"),
			LoadMilestone::NetworkIdle => write!(f, "networkidle"),
			LoadMilestone::Commit => write!(f, "commit"),
		}
	}
}

/// The browser engine process, started once per run.
#[async_trait]
pub trait Engine: Send + Sync {
	/// Launches a fresh browser process.
	async fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserInstance>>;

	/// Stops the engine. Browser instances must already be closed.
	async fn shutdown(&self) -> Result<()>;
}

/// One browser process, owned by a single test.
#[async_trait]
pub trait BrowserInstance: Send + Sync {
	/// Creates an isolated cookie/storage context bound to `base_url`.
	async fn new_context(&self, base_url: &Url) -> Result<Box<dyn SessionContext>>;

	async fn close(&self) -> Result<()>;
}

/// Isolated cookie/storage domain.
#[async_trait]
pub trait SessionContext: Send + Sync {
	fn base_url(&self) -> &Url;

	async fn new_page(&self) -> Result<Arc<dyn PageHandle>>;

	/// Closes the context and every page still open in it.
	async fn close(&self) -> Result<()>;
}

/// One tab within a [`SessionContext`].
#[async_trait]
pub trait PageHandle: Send + Sync {
	/// Last committed URL.
	fn url(&self) -> String;

	async fn goto(&self, url: &str, milestone: LoadMilestone, timeout: Duration) -> Result<()>;

	/// Single visibility check; callers poll for waits.
	async fn is_visible(&self, selector: &str) -> Result<bool>;

	async fn fill(&self, selector: &str, value: &str) -> Result<()>;

	async fn press(&self, selector: &str, key: &str) -> Result<()>;

	async fn click(&self, selector: &str) -> Result<()>;

	/// Evaluates a JavaScript expression and returns its value as a string.
	async fn evaluate(&self, expression: &str) -> Result<String>;

	/// Full serialized DOM.
	async fn content(&self) -> Result<String>;

	/// PNG bytes of the viewport.
	async fn screenshot(&self) -> Result<Vec<u8>>;

	async fn close(&self) -> Result<()>;
}
