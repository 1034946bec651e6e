use std::path::PathBuf;

use thiserror::Error;

use crate::session::LoginOutcome;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("browser launch failed: {0}")]
	BrowserLaunch(String),

	/// The initial navigation never reached its load milestone.
	#[error("page load of {url} failed (budget {ms}ms)")]
	PageLoad {
		url: String,
		ms: u64,
		#[source]
		source: Box<HarnessError>,
	},

	/// The post-login readiness marker never appeared.
	#[error("readiness marker {selector} not visible after {ms}ms (login: {login})")]
	Readiness { selector: String, ms: u64, login: LoginOutcome },

	#[error("timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	#[error("element not found: {selector}")]
	ElementNotFound { selector: String },

	#[error("javascript evaluation failed: {0}")]
	JsEval(String),

	#[error("failed to write artifact: {path}")]
	Artifact {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{0} has already been closed")]
	Closed(&'static str),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Playwright(#[from] playwright_rs::Error),
}

impl HarnessError {
	/// True for the failures that stop the session fixture before a test body can run.
	pub fn is_fatal_fixture(&self) -> bool {
		matches!(self, HarnessError::PageLoad { .. } | HarnessError::Readiness { .. })
	}
}
