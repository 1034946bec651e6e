//! Harness configuration.
//!
//! Everything the fixtures need about the target instance lives here and is
//! passed in explicitly: base URL, credentials, timeouts, selectors, browser
//! launch options and artifact locations. A config file is plain JSON with
//! camelCase keys; every field has a default so partial files are fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HarnessError, Result};

/// Browser engine used for launches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
	/// Chromium-based browser (Chrome, Edge)
	#[default]
	Chromium,
	/// Mozilla Firefox
	Firefox,
	/// WebKit (Safari)
	Webkit,
}

impl std::fmt::Display for BrowserKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			BrowserKind::Chromium => write!(f, "chromium"),
			BrowserKind::Firefox => write!(f, "firefox"),
			BrowserKind::Webkit => write!(f, "webkit"),
		}
	}
}

impl std::str::FromStr for BrowserKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"chromium" | "chrome" => Ok(BrowserKind::Chromium),
			"firefox" => Ok(BrowserKind::Firefox),
			"webkit" => Ok(BrowserKind::Webkit),
			_ => Err(format!("unknown browser: {s}")),
		}
	}
}

/// Complete configuration for one harness run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HarnessConfig {
	pub base_url: Url,
	pub username: String,
	pub password: String,
	/// Repository folder expected to exist server-side.
	pub repo_name: String,
	pub timeouts: Timeouts,
	pub poll: PollConfig,
	pub selectors: Selectors,
	pub browser: BrowserOptions,
	pub artifacts: ArtifactConfig,
	#[serde(with = "duration_ms")]
	pub webdav_timeout: Duration,
}

impl Default for HarnessConfig {
	fn default() -> Self {
		Self {
			base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
			username: "admin".to_string(),
			password: "admin".to_string(),
			repo_name: "BrowserTestRepo".to_string(),
			timeouts: Timeouts::default(),
			poll: PollConfig::default(),
			selectors: Selectors::default(),
			browser: BrowserOptions::default(),
			artifacts: ArtifactConfig::default(),
			webdav_timeout: Duration::from_secs(10),
		}
	}
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:80";

/// Bounded waits used by the session fixture and scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timeouts {
	/// Initial navigation up to DOMContentLoaded.
	#[serde(with = "duration_ms")]
	pub page_load: Duration,
	/// Looking for the login form after the first render.
	#[serde(with = "duration_ms")]
	pub login_probe: Duration,
	/// Post-login readiness marker.
	#[serde(with = "duration_ms")]
	pub readiness: Duration,
	/// Navigation triggered by submitting the login form.
	#[serde(with = "duration_ms")]
	pub navigation: Duration,
	/// Upper bound for client-side rendering to settle.
	#[serde(with = "duration_ms")]
	pub settle: Duration,
	/// Scenario lookups of an element that should already be rendered.
	#[serde(with = "duration_ms")]
	pub element: Duration,
	/// Each entry of a fallback selector chain.
	#[serde(with = "duration_ms")]
	pub element_step: Duration,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			page_load: Duration::from_secs(30),
			login_probe: Duration::from_secs(5),
			readiness: Duration::from_secs(10),
			navigation: Duration::from_secs(30),
			settle: Duration::from_secs(3),
			element: Duration::from_secs(5),
			element_step: Duration::from_secs(2),
		}
	}
}

/// Backoff between condition polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollConfig {
	#[serde(with = "duration_ms")]
	pub initial: Duration,
	#[serde(with = "duration_ms")]
	pub max: Duration,
}

impl Default for PollConfig {
	fn default() -> Self {
		Self {
			initial: Duration::from_millis(100),
			max: Duration::from_secs(1),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Selectors {
	pub username_input: String,
	pub password_input: String,
	/// Element present on the first authenticated render.
	pub readiness_marker: String,
}

impl Default for Selectors {
	fn default() -> Self {
		Self {
			username_input: r#"input[name="user"]"#.to_string(),
			password_input: r#"input[name="password"]"#.to_string(),
			readiness_marker: "#header".to_string(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserOptions {
	pub kind: BrowserKind,
	pub headless: bool,
}

impl Default for BrowserOptions {
	fn default() -> Self {
		Self {
			kind: BrowserKind::default(),
			headless: true,
		}
	}
}

/// Where screenshots, HTML dumps and fixture diagnostics are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArtifactConfig {
	pub root: PathBuf,
	/// Relative to `root`.
	pub screenshots: PathBuf,
	/// Relative to `root`.
	pub html: PathBuf,
	pub failure_screenshot: PathBuf,
	pub failure_html: PathBuf,
	/// When set, the captured auth state is written here as JSON.
	pub auth_state: Option<PathBuf>,
}

impl Default for ArtifactConfig {
	fn default() -> Self {
		Self {
			root: PathBuf::from("target/repos-e2e"),
			screenshots: PathBuf::from("screenshots"),
			html: PathBuf::from("html_output"),
			failure_screenshot: PathBuf::from("/tmp/login-failure.png"),
			failure_html: PathBuf::from("/tmp/login-failure.html"),
			auth_state: None,
		}
	}
}

impl HarnessConfig {
	/// Loads a config file, filling unspecified fields with defaults.
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.map_err(|e| HarnessError::Config(format!("cannot read {}: {e}", path.display())))?;
		let config: HarnessConfig =
			serde_json::from_str(&content).map_err(|e| HarnessError::Config(format!("cannot parse {}: {e}", path.display())))?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects configurations the fixtures cannot work with.
	pub fn validate(&self) -> Result<()> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(HarnessError::Config(format!("base URL must be http(s), got {}", self.base_url)));
		}
		if self.base_url.host_str().is_none() {
			return Err(HarnessError::Config(format!("base URL has no host: {}", self.base_url)));
		}
		if self.username.is_empty() {
			return Err(HarnessError::Config("username must not be empty".into()));
		}

		let t = &self.timeouts;
		for (name, value) in [
			("pageLoad", t.page_load),
			("loginProbe", t.login_probe),
			("readiness", t.readiness),
			("navigation", t.navigation),
			("settle", t.settle),
			("element", t.element),
			("elementStep", t.element_step),
			("webdavTimeout", self.webdav_timeout),
		] {
			if value.is_zero() {
				return Err(HarnessError::Config(format!("timeout {name} must be greater than zero")));
			}
		}
		if self.poll.initial.is_zero() || self.poll.max < self.poll.initial {
			return Err(HarnessError::Config("poll interval must be non-zero and max >= initial".into()));
		}
		Ok(())
	}

	/// Resolves `path` against the base URL (`"apps/files/"` -> `http://host/apps/files/`).
	pub fn url(&self, path: &str) -> String {
		let base = self.base_url.as_str().trim_end_matches('/');
		let path = path.trim_start_matches('/');
		if path.is_empty() { format!("{base}/") } else { format!("{base}/{path}") }
	}

	pub fn screenshots_dir(&self) -> PathBuf {
		self.artifacts.root.join(&self.artifacts.screenshots)
	}

	pub fn html_dir(&self) -> PathBuf {
		self.artifacts.root.join(&self.artifacts.html)
	}
}

mod duration_ms {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
