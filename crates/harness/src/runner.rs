//! Suite runner: fixture lifecycle around each scenario.
//!
//! Per test: setup (browser instance, authenticated session, page) → call
//! (scenario body) → teardown (context, then browser). Hooks run after every
//! phase. Teardown always runs once setup produced anything.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::{Artifact, ArtifactDirs};
use crate::config::HarnessConfig;
use crate::driver::{BrowserInstance, Engine, PageHandle};
use crate::error::Result;
use crate::hook::{ArtifactCaptureHook, Phase, PhaseHook, PhaseOutcome, PhaseReport};
use crate::session::{AuthenticatedSession, LoginOutcome};
use crate::test_id::{QualifiedName, TestId};

/// Fixtures a scenario asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Needs {
	/// Runs without a browser.
	Nothing,
	/// Gets a page in an authenticated session.
	Page,
}

/// How a scenario body finished when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
	Passed,
	/// The body ran but could not confirm the behaviour; reported, never a failure.
	Inconclusive(String),
}

/// What a scenario body can reach.
pub struct Fixtures<'a> {
	config: &'a HarnessConfig,
	id: &'a TestId,
	dirs: &'a ArtifactDirs,
	page: Option<Arc<dyn PageHandle>>,
	snapshots: Mutex<Vec<Artifact>>,
}

impl<'a> Fixtures<'a> {
	pub fn new(config: &'a HarnessConfig, id: &'a TestId, dirs: &'a ArtifactDirs, page: Option<Arc<dyn PageHandle>>) -> Self {
		Self {
			config,
			id,
			dirs,
			page,
			snapshots: Mutex::new(Vec::new()),
		}
	}

	pub fn config(&self) -> &HarnessConfig {
		self.config
	}

	pub fn id(&self) -> &TestId {
		self.id
	}

	/// The primary page. Errors when the scenario did not ask for one.
	pub fn page(&self) -> anyhow::Result<&dyn PageHandle> {
		self.page
			.as_deref()
			.ok_or_else(|| anyhow::anyhow!("scenario {} did not request the page fixture", self.id))
	}

	/// Saves an intermediate `<id>@<step>` screenshot and HTML dump.
	///
	/// Returns how many files were written.
	pub async fn snapshot(&self, step: &str) -> usize {
		let Some(page) = self.page.as_deref() else {
			return 0;
		};
		let artifacts = self.dirs.capture_step(page, self.id, step).await;
		let written = artifacts.len();
		self.snapshots.lock().unwrap_or_else(|e| e.into_inner()).extend(artifacts);
		written
	}

	/// Step snapshots taken so far.
	pub fn into_snapshots(self) -> Vec<Artifact> {
		self.snapshots.into_inner().unwrap_or_else(|e| e.into_inner())
	}
}

#[async_trait]
pub trait Scenario: Send + Sync {
	/// Fully-qualified name, unique within a suite.
	fn name(&self) -> &QualifiedName;

	fn needs(&self) -> Needs;

	fn description(&self) -> &str {
		""
	}

	async fn run(&self, fixtures: &Fixtures<'_>) -> anyhow::Result<Verdict>;
}

/// One test invocation as seen by hooks.
pub struct TestItem {
	name: QualifiedName,
	id: TestId,
	needs: Needs,
	page: Option<Arc<dyn PageHandle>>,
	captured: Mutex<HashSet<Phase>>,
	artifacts: Mutex<Vec<Artifact>>,
}

impl TestItem {
	pub fn new(name: QualifiedName, needs: Needs) -> Self {
		let id = name.test_id();
		Self {
			name,
			id,
			needs,
			page: None,
			captured: Mutex::new(HashSet::new()),
			artifacts: Mutex::new(Vec::new()),
		}
	}

	pub fn name(&self) -> &QualifiedName {
		&self.name
	}

	pub fn id(&self) -> &TestId {
		&self.id
	}

	pub fn needs(&self) -> Needs {
		self.needs
	}

	/// The page bound by the page fixture, if setup got that far.
	pub fn page(&self) -> Option<&Arc<dyn PageHandle>> {
		self.page.as_ref()
	}

	pub fn bind_page(&mut self, page: Arc<dyn PageHandle>) {
		self.page = Some(page);
	}

	/// Returns false when `phase` was already captured for this item.
	pub fn mark_captured(&self, phase: Phase) -> bool {
		self.captured.lock().unwrap_or_else(|e| e.into_inner()).insert(phase)
	}

	pub fn record_artifacts(&self, artifacts: Vec<Artifact>) {
		self.artifacts.lock().unwrap_or_else(|e| e.into_inner()).extend(artifacts);
	}

	pub fn artifacts(&self) -> Vec<Artifact> {
		self.artifacts.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
	Passed,
	/// The body failed an assertion or panicked.
	Failed,
	/// Setup or teardown failed.
	Error,
	Inconclusive,
}

impl std::fmt::Display for TestOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TestOutcome::Passed => write!(f, "PASSED"),
			TestOutcome::Failed => write!(f, "FAILED"),
			TestOutcome::Error => write!(f, "ERROR"),
			TestOutcome::Inconclusive => write!(f, "INCONCLUSIVE"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
	pub name: String,
	pub id: TestId,
	pub outcome: TestOutcome,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub login: Option<LoginOutcome>,
	pub phases: Vec<PhaseReport>,
	pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
	pub tests: Vec<TestReport>,
}

impl SuiteReport {
	pub fn count(&self, outcome: TestOutcome) -> usize {
		self.tests.iter().filter(|t| t.outcome == outcome).count()
	}

	/// No test failed or errored.
	pub fn is_success(&self) -> bool {
		self.tests
			.iter()
			.all(|t| !matches!(t.outcome, TestOutcome::Failed | TestOutcome::Error))
	}
}

/// Keeps only scenarios whose qualified name contains `filter`.
pub fn select<'s>(scenarios: &'s [Box<dyn Scenario>], filter: Option<&str>) -> Vec<&'s dyn Scenario> {
	scenarios
		.iter()
		.map(|s| s.as_ref())
		.filter(|s| filter.is_none_or(|f| s.name().as_str().contains(f)))
		.collect()
}

struct Resources {
	browser: Box<dyn BrowserInstance>,
	session: AuthenticatedSession,
	page: Arc<dyn PageHandle>,
}

pub struct Suite {
	config: Arc<HarnessConfig>,
	engine: Arc<dyn Engine>,
	dirs: ArtifactDirs,
	hooks: Vec<Box<dyn PhaseHook>>,
}

impl Suite {
	/// Suite with the artifact capture hook installed.
	pub fn new(config: Arc<HarnessConfig>, engine: Arc<dyn Engine>) -> Self {
		let dirs = ArtifactDirs::from_config(&config);
		let capture = ArtifactCaptureHook::new(dirs.clone());
		Self {
			config,
			engine,
			dirs,
			hooks: vec![Box::new(capture)],
		}
	}

	/// Suite without any hooks.
	pub fn bare(config: Arc<HarnessConfig>, engine: Arc<dyn Engine>) -> Self {
		let dirs = ArtifactDirs::from_config(&config);
		Self {
			config,
			engine,
			dirs,
			hooks: Vec::new(),
		}
	}

	pub fn with_hook(mut self, hook: Box<dyn PhaseHook>) -> Self {
		self.hooks.push(hook);
		self
	}

	/// Runs scenarios one after another.
	pub async fn run(&self, scenarios: &[&dyn Scenario]) -> SuiteReport {
		if let Err(e) = self.dirs.ensure() {
			warn!(target = "repos", error = %e, "artifact directories unavailable");
		}

		let mut report = SuiteReport::default();
		for scenario in scenarios {
			report.tests.push(self.run_one(*scenario).await);
		}
		info!(
			target = "repos",
			passed = report.count(TestOutcome::Passed),
			failed = report.count(TestOutcome::Failed),
			errors = report.count(TestOutcome::Error),
			inconclusive = report.count(TestOutcome::Inconclusive),
			"suite finished"
		);
		report
	}

	/// Stops the engine.
	pub async fn shutdown(self) -> Result<()> {
		self.engine.shutdown().await
	}

	pub async fn run_one(&self, scenario: &dyn Scenario) -> TestReport {
		let mut item = TestItem::new(scenario.name().clone(), scenario.needs());
		let mut phases = Vec::with_capacity(3);
		info!(target = "repos", test = %item.name(), "running");

		let started = Instant::now();
		let setup = match scenario.needs() {
			Needs::Nothing => Ok(None),
			Needs::Page => self.acquire().await.map(Some),
		};
		let (resources, setup_outcome) = match setup {
			Ok(resources) => (resources, PhaseOutcome::Passed),
			Err(e) => (None, PhaseOutcome::Failed(e.to_string())),
		};
		let login = resources.as_ref().map(|r| r.session.login_outcome().clone());
		if let Some(resources) = &resources {
			item.bind_page(resources.page.clone());
		}
		let setup_report = self.finish_phase(&item, Phase::Setup, setup_outcome, started).await;
		let setup_failed = setup_report.outcome.is_failed();
		phases.push(setup_report);

		if !setup_failed {
			let started = Instant::now();
			let fixtures = Fixtures::new(&self.config, item.id(), &self.dirs, item.page().cloned());
			let outcome = match AssertUnwindSafe(scenario.run(&fixtures)).catch_unwind().await {
				Ok(Ok(Verdict::Passed)) => PhaseOutcome::Passed,
				Ok(Ok(Verdict::Inconclusive(note))) => PhaseOutcome::Inconclusive(note),
				Ok(Err(e)) => PhaseOutcome::Failed(format!("{e:#}")),
				Err(panic) => PhaseOutcome::Failed(panic_message(panic.as_ref())),
			};
			item.record_artifacts(fixtures.into_snapshots());
			phases.push(self.finish_phase(&item, Phase::Call, outcome, started).await);
		}

		if let Some(resources) = resources {
			let started = Instant::now();
			let outcome = match release(resources).await {
				Ok(()) => PhaseOutcome::Passed,
				Err(e) => PhaseOutcome::Failed(e.to_string()),
			};
			phases.push(self.finish_phase(&item, Phase::Teardown, outcome, started).await);
		}

		let (outcome, message) = resolve_outcome(&phases);
		info!(target = "repos", test = %item.name(), outcome = %outcome, "finished");

		TestReport {
			name: item.name().to_string(),
			id: item.id().clone(),
			outcome,
			message,
			login,
			artifacts: item.artifacts(),
			phases,
		}
	}

	async fn finish_phase(&self, item: &TestItem, phase: Phase, outcome: PhaseOutcome, started: Instant) -> PhaseReport {
		let report = PhaseReport {
			phase,
			outcome,
			duration_ms: started.elapsed().as_millis() as u64,
		};
		if let Some(msg) = report.outcome.message() {
			info!(target = "repos", test = %item.id(), phase = %phase, message = %msg, "phase finished");
		}
		for hook in &self.hooks {
			hook.after_phase(item, &report).await;
		}
		report
	}

	/// Browser instance, authenticated session and page, in that order.
	///
	/// Anything acquired before a failure is released again.
	async fn acquire(&self) -> Result<Resources> {
		let browser = self.engine.launch(&self.config.browser).await?;

		let session = match AuthenticatedSession::establish(browser.as_ref(), self.config.clone()).await {
			Ok(session) => session,
			Err(e) => {
				close_browser(browser.as_ref()).await;
				return Err(e);
			}
		};

		match session.new_page().await {
			Ok(page) => Ok(Resources { browser, session, page }),
			Err(e) => {
				if let Err(close_err) = session.close().await {
					warn!(target = "repos", error = %close_err, "failed to close session after page fixture failure");
				}
				close_browser(browser.as_ref()).await;
				Err(e)
			}
		}
	}
}

/// Closes the context, then the browser. Both are attempted.
async fn release(resources: Resources) -> Result<()> {
	let Resources { browser, session, page } = resources;
	drop(page);
	let session_result = session.close().await;
	let browser_result = browser.close().await;
	session_result.and(browser_result)
}

async fn close_browser(browser: &dyn BrowserInstance) {
	if let Err(e) = browser.close().await {
		warn!(target = "repos", error = %e, "failed to close browser");
	}
}

fn resolve_outcome(phases: &[PhaseReport]) -> (TestOutcome, Option<String>) {
	let find = |phase| phases.iter().find(|r| r.phase == phase);

	if let Some(PhaseReport {
		outcome: PhaseOutcome::Failed(msg),
		..
	}) = find(Phase::Setup)
	{
		return (TestOutcome::Error, Some(msg.clone()));
	}
	match find(Phase::Call).map(|r| &r.outcome) {
		Some(PhaseOutcome::Failed(msg)) => return (TestOutcome::Failed, Some(msg.clone())),
		Some(PhaseOutcome::Inconclusive(note)) => {
			if let Some(PhaseReport {
				outcome: PhaseOutcome::Failed(msg),
				..
			}) = find(Phase::Teardown)
			{
				return (TestOutcome::Error, Some(msg.clone()));
			}
			return (TestOutcome::Inconclusive, Some(note.clone()));
		}
		_ => {}
	}
	if let Some(PhaseReport {
		outcome: PhaseOutcome::Failed(msg),
		..
	}) = find(Phase::Teardown)
	{
		return (TestOutcome::Error, Some(msg.clone()));
	}
	(TestOutcome::Passed, None)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
	if let Some(msg) = panic.downcast_ref::<&str>() {
		format!("panicked: {msg}")
	} else if let Some(msg) = panic.downcast_ref::<String>() {
		format!("panicked: {msg}")
	} else {
		"panicked".to_string()
	}
}
