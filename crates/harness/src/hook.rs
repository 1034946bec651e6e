//! Phase-completion hooks.
//!
//! The runner calls every [`PhaseHook`] after each phase of a test. Hooks see
//! the phase report by shared reference and return nothing, so they cannot
//! change a test's outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::ArtifactDirs;
use crate::runner::{Needs, TestItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
	Setup,
	Call,
	Teardown,
}

impl std::fmt::Display for Phase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Phase::Setup => write!(f, "setup"),
			Phase::Call => write!(f, "call"),
			Phase::Teardown => write!(f, "teardown"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum PhaseOutcome {
	Passed,
	Failed(String),
	/// Ran to completion without being able to confirm the behaviour.
	Inconclusive(String),
}

impl PhaseOutcome {
	pub fn is_failed(&self) -> bool {
		matches!(self, PhaseOutcome::Failed(_))
	}

	pub fn message(&self) -> Option<&str> {
		match self {
			PhaseOutcome::Passed => None,
			PhaseOutcome::Failed(msg) | PhaseOutcome::Inconclusive(msg) => Some(msg),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport {
	pub phase: Phase,
	pub outcome: PhaseOutcome,
	pub duration_ms: u64,
}

#[async_trait]
pub trait PhaseHook: Send + Sync {
	async fn after_phase(&self, item: &TestItem, report: &PhaseReport);
}

/// Captures a screenshot and HTML dump for every test that used a page.
///
/// Runs after the call phase, and after the setup phase when setup failed.
pub struct ArtifactCaptureHook {
	dirs: ArtifactDirs,
}

impl ArtifactCaptureHook {
	pub fn new(dirs: ArtifactDirs) -> Self {
		Self { dirs }
	}

	fn wants(report: &PhaseReport) -> bool {
		match report.phase {
			Phase::Call => true,
			Phase::Setup => report.outcome.is_failed(),
			Phase::Teardown => false,
		}
	}
}

#[async_trait]
impl PhaseHook for ArtifactCaptureHook {
	async fn after_phase(&self, item: &TestItem, report: &PhaseReport) {
		if !Self::wants(report) {
			return;
		}
		if item.needs() != Needs::Page {
			return;
		}
		let Some(page) = item.page() else {
			debug!(target = "repos", test = %item.id(), phase = %report.phase, "no page bound, skipping capture");
			return;
		};
		if !item.mark_captured(report.phase) {
			return;
		}

		let artifacts = self.dirs.capture_pair(page.as_ref(), item.id()).await;
		debug!(target = "repos", test = %item.id(), phase = %report.phase, count = artifacts.len(), "phase artifacts captured");
		item.record_artifacts(artifacts);
	}
}
