//! Screenshot and HTML artifacts.
//!
//! Capture is always best effort: a failure to write an artifact is logged
//! and never propagates, so the failure being diagnosed stays the one
//! reported.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::driver::PageHandle;
use crate::error::{HarnessError, Result};
use crate::test_id::TestId;

/// Types of artifacts the harness produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
	Screenshot,
	Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
	#[serde(rename = "type")]
	pub kind: ArtifactKind,
	pub path: PathBuf,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub size_bytes: Option<u64>,
}

/// Output directories for screenshots and HTML dumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDirs {
	pub screenshots: PathBuf,
	pub html: PathBuf,
}

impl ArtifactDirs {
	pub fn new(screenshots: impl Into<PathBuf>, html: impl Into<PathBuf>) -> Self {
		Self {
			screenshots: screenshots.into(),
			html: html.into(),
		}
	}

	pub fn from_config(config: &HarnessConfig) -> Self {
		Self::new(config.screenshots_dir(), config.html_dir())
	}

	/// Creates both directories. Existing directories are left untouched.
	pub fn ensure(&self) -> Result<()> {
		ensure_dir(&self.screenshots)?;
		ensure_dir(&self.html)?;
		Ok(())
	}

	pub fn screenshot_path(&self, name: &str) -> PathBuf {
		self.screenshots.join(format!("{name}.png"))
	}

	pub fn html_path(&self, name: &str) -> PathBuf {
		self.html.join(format!("{name}.html"))
	}

	/// Captures `<id>.png` and `<id>.html`.
	pub async fn capture_pair(&self, page: &dyn PageHandle, id: &TestId) -> Vec<Artifact> {
		self.capture_named(page, id.as_str()).await
	}

	/// Captures `<id>@<step>.png` and `<id>@<step>.html`.
	pub async fn capture_step(&self, page: &dyn PageHandle, id: &TestId, step: &str) -> Vec<Artifact> {
		self.capture_named(page, &id.step(step)).await
	}

	async fn capture_named(&self, page: &dyn PageHandle, name: &str) -> Vec<Artifact> {
		if let Err(e) = self.ensure() {
			warn!(target = "repos", error = %e, "failed to create artifact directories");
			return Vec::new();
		}

		let mut collected = Vec::new();
		collected.extend(capture_screenshot(page, &self.screenshot_path(name)).await);
		collected.extend(capture_html(page, &self.html_path(name)).await);

		debug!(target = "repos", name, count = collected.len(), "captured artifacts");
		collected
	}
}

/// Creates `path` and its parents; a directory that already exists is fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
	std::fs::create_dir_all(path).map_err(|source| HarnessError::Artifact {
		path: path.to_path_buf(),
		source,
	})
}

/// Writes a screenshot of `page` to `path`.
pub async fn capture_screenshot(page: &dyn PageHandle, path: &Path) -> Option<Artifact> {
	let bytes = match page.screenshot().await {
		Ok(bytes) => bytes,
		Err(e) => {
			warn!(target = "repos", path = %path.display(), error = %e, "failed to capture screenshot");
			return None;
		}
	};
	match write_artifact(path, &bytes).await {
		Ok(()) => Some(Artifact {
			kind: ArtifactKind::Screenshot,
			path: path.to_path_buf(),
			size_bytes: Some(bytes.len() as u64),
		}),
		Err(e) => {
			warn!(target = "repos", error = %e, "failed to write screenshot");
			None
		}
	}
}

/// Writes the serialized DOM of `page` to `path`.
pub async fn capture_html(page: &dyn PageHandle, path: &Path) -> Option<Artifact> {
	let html = match page.content().await {
		Ok(html) => html,
		Err(e) => {
			warn!(target = "repos", path = %path.display(), error = %e, "failed to capture HTML content");
			return None;
		}
	};
	match write_artifact(path, html.as_bytes()).await {
		Ok(()) => Some(Artifact {
			kind: ArtifactKind::Html,
			path: path.to_path_buf(),
			size_bytes: Some(html.len() as u64),
		}),
		Err(e) => {
			warn!(target = "repos", error = %e, "failed to write HTML file");
			None
		}
	}
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			ensure_dir(parent)?;
		}
	}
	tokio::fs::write(path, bytes).await.map_err(|source| HarnessError::Artifact {
		path: path.to_path_buf(),
		source,
	})
}
