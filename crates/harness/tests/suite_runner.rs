//! Fixture lifecycle and artifact capture around scenario bodies.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{FakeEngine, Script, fast_config};
use repos_harness::artifacts::{ArtifactDirs, ArtifactKind};
use repos_harness::driver::{BrowserInstance, SessionContext};
use repos_harness::hook::{ArtifactCaptureHook, Phase, PhaseHook, PhaseOutcome, PhaseReport};
use repos_harness::runner::{Fixtures, Needs, Scenario, Suite, TestItem, TestOutcome, Verdict, select};
use repos_harness::session::LoginOutcome;
use repos_harness::test_id::QualifiedName;

enum Body {
	Pass,
	Fail,
	Panic,
	Inconclusive,
}

struct Probe {
	name: QualifiedName,
	needs: Needs,
	body: Body,
	ran: AtomicBool,
}

impl Probe {
	fn new(name: &str, needs: Needs, body: Body) -> Self {
		Self {
			name: QualifiedName::parse(name).unwrap(),
			needs,
			body,
			ran: AtomicBool::new(false),
		}
	}
}

#[async_trait]
impl Scenario for Probe {
	fn name(&self) -> &QualifiedName {
		&self.name
	}

	fn needs(&self) -> Needs {
		self.needs
	}

	async fn run(&self, fx: &Fixtures<'_>) -> anyhow::Result<Verdict> {
		self.ran.store(true, Ordering::SeqCst);
		if self.needs == Needs::Page {
			fx.page()?;
		}
		match self.body {
			Body::Pass => Ok(Verdict::Passed),
			Body::Fail => anyhow::bail!("assertion failed: boom"),
			Body::Panic => panic!("scenario exploded"),
			Body::Inconclusive => Ok(Verdict::Inconclusive("could not confirm".into())),
		}
	}
}

#[tokio::test]
async fn passing_test_gets_artifacts_named_by_id() {
	let dir = tempfile::tempdir().unwrap();
	let config = Arc::new(fast_config(dir.path()));
	let engine = FakeEngine::new(Script::default());
	let suite = Suite::new(config.clone(), engine.clone());
	let probe = Probe::new("app_enabled::repos_app_enabled", Needs::Page, Body::Pass);

	let report = suite.run_one(&probe).await;

	assert_eq!(report.outcome, TestOutcome::Passed);
	assert_eq!(report.id.as_str(), "app_enabled-repos_app_enabled");
	assert_eq!(report.login, Some(LoginOutcome::Succeeded));
	let png = config.screenshots_dir().join("app_enabled-repos_app_enabled.png");
	let html = config.html_dir().join("app_enabled-repos_app_enabled.html");
	assert!(png.is_file());
	assert!(html.is_file());
	let kinds: Vec<_> = report.artifacts.iter().map(|a| a.kind).collect();
	assert_eq!(kinds, vec![ArtifactKind::Screenshot, ArtifactKind::Html]);

	let phases: Vec<_> = report.phases.iter().map(|p| p.phase).collect();
	assert_eq!(phases, vec![Phase::Setup, Phase::Call, Phase::Teardown]);
}

#[tokio::test]
async fn teardown_closes_context_before_browser() {
	let dir = tempfile::tempdir().unwrap();
	let engine = FakeEngine::new(Script::default());
	let suite = Suite::new(Arc::new(fast_config(dir.path())), engine.clone());

	suite.run_one(&Probe::new("a::b", Needs::Page, Body::Pass)).await;

	let context = engine.log.position("context.close").unwrap();
	let browser = engine.log.position("browser.close").unwrap();
	assert!(context < browser);
	assert_eq!(engine.log.count("context.close"), 1);
	assert_eq!(engine.log.count("browser.close"), 1);
	// capture happens before teardown
	assert!(engine.log.position("screenshot").unwrap() < context);
}

#[tokio::test]
async fn capture_failure_never_masks_the_outcome() {
	let dir = tempfile::tempdir().unwrap();
	let config = Arc::new(fast_config(dir.path()));
	let engine = FakeEngine::new(Script {
		fail_screenshot: true,
		..Script::default()
	});
	let suite = Suite::new(config.clone(), engine.clone());

	let failed = suite.run_one(&Probe::new("m::failing", Needs::Page, Body::Fail)).await;
	let passed = suite.run_one(&Probe::new("m::passing", Needs::Page, Body::Pass)).await;

	assert_eq!(failed.outcome, TestOutcome::Failed);
	assert_eq!(failed.message.as_deref(), Some("assertion failed: boom"));
	assert_eq!(passed.outcome, TestOutcome::Passed);
	assert!(passed.message.is_none());

	// the HTML half still succeeds
	assert!(config.html_dir().join("m-passing.html").is_file());
	assert!(!config.screenshots_dir().join("m-passing.png").exists());
}

#[tokio::test]
async fn setup_failure_is_an_error_and_skips_the_body() {
	let dir = tempfile::tempdir().unwrap();
	let engine = FakeEngine::new(Script {
		ready: false,
		..Script::default()
	});
	let suite = Suite::new(Arc::new(fast_config(dir.path())), engine.clone());
	let probe = Probe::new("m::never_ready", Needs::Page, Body::Pass);

	let report = suite.run_one(&probe).await;

	assert_eq!(report.outcome, TestOutcome::Error);
	assert!(report.message.unwrap().contains("#header"));
	assert!(!probe.ran.load(Ordering::SeqCst));
	assert!(report.phases.iter().all(|p| p.phase == Phase::Setup));
	assert!(report.artifacts.is_empty());
	// fixture closes its context, runner closes the browser
	assert_eq!(engine.log.count("context.close"), 1);
	assert_eq!(engine.log.count("browser.close"), 1);
}

#[tokio::test]
async fn tests_without_page_get_no_browser_and_no_capture() {
	let dir = tempfile::tempdir().unwrap();
	let config = Arc::new(fast_config(dir.path()));
	let engine = FakeEngine::new(Script::default());
	let suite = Suite::new(config.clone(), engine.clone());

	let report = suite.run_one(&Probe::new("m::http_only", Needs::Nothing, Body::Pass)).await;

	assert_eq!(report.outcome, TestOutcome::Passed);
	assert!(report.artifacts.is_empty());
	assert!(report.login.is_none());
	assert_eq!(engine.log.count("launch"), 0);
	assert!(!config.html_dir().join("m-http_only.html").exists());
}

#[tokio::test]
async fn panics_are_reported_as_failures() {
	let dir = tempfile::tempdir().unwrap();
	let engine = FakeEngine::new(Script::default());
	let suite = Suite::new(Arc::new(fast_config(dir.path())), engine.clone());

	let report = suite.run_one(&Probe::new("m::explodes", Needs::Page, Body::Panic)).await;

	assert_eq!(report.outcome, TestOutcome::Failed);
	assert_eq!(report.message.as_deref(), Some("panicked: scenario exploded"));
	assert_eq!(report.artifacts.len(), 2);
	assert_eq!(engine.log.count("browser.close"), 1);
}

#[tokio::test]
async fn teardown_failure_still_closes_browser() {
	let dir = tempfile::tempdir().unwrap();
	let engine = FakeEngine::new(Script {
		fail_context_close: true,
		..Script::default()
	});
	let suite = Suite::new(Arc::new(fast_config(dir.path())), engine.clone());

	let report = suite.run_one(&Probe::new("m::leaky", Needs::Page, Body::Pass)).await;

	assert_eq!(report.outcome, TestOutcome::Error);
	let teardown = report.phases.iter().find(|p| p.phase == Phase::Teardown).unwrap();
	assert!(teardown.outcome.is_failed());
	assert_eq!(engine.log.count("browser.close"), 1);
}

#[tokio::test]
async fn suite_runs_in_order_and_summarises() {
	let dir = tempfile::tempdir().unwrap();
	let engine = FakeEngine::new(Script::default());
	let suite = Suite::new(Arc::new(fast_config(dir.path())), engine.clone());

	let scenarios: Vec<Box<dyn Scenario>> = vec![
		Box::new(Probe::new("alpha::one", Needs::Page, Body::Pass)),
		Box::new(Probe::new("alpha::two", Needs::Page, Body::Inconclusive)),
		Box::new(Probe::new("beta::three", Needs::Nothing, Body::Fail)),
	];

	let alpha = select(&scenarios, Some("alpha::"));
	let report = suite.run(&alpha).await;
	assert_eq!(report.tests.len(), 2);
	assert!(report.is_success());
	assert_eq!(report.count(TestOutcome::Inconclusive), 1);
	let call = report.tests[1].phases.iter().find(|p| p.phase == Phase::Call).unwrap();
	assert_eq!(call.outcome, PhaseOutcome::Inconclusive("could not confirm".into()));

	let all = select(&scenarios, None);
	let report = suite.run(&all).await;
	let names: Vec<_> = report.tests.iter().map(|t| t.name.as_str()).collect();
	assert_eq!(names, vec!["alpha::one", "alpha::two", "beta::three"]);
	assert!(!report.is_success());

	suite.shutdown().await.unwrap();
	assert_eq!(engine.log.count("engine.shutdown"), 1);
}

#[tokio::test]
async fn report_serializes_for_machines() {
	let dir = tempfile::tempdir().unwrap();
	let engine = FakeEngine::new(Script::default());
	let suite = Suite::new(Arc::new(fast_config(dir.path())), engine);

	let probe = Probe::new("m::json", Needs::Page, Body::Pass);
	let report = suite.run(&[&probe]).await;
	let json = serde_json::to_value(&report).unwrap();

	assert_eq!(json["tests"][0]["id"], "m-json");
	assert_eq!(json["tests"][0]["outcome"], "passed");
	assert_eq!(json["tests"][0]["login"]["status"], "succeeded");
	assert_eq!(json["tests"][0]["artifacts"][0]["type"], "screenshot");
}

#[derive(Default)]
struct Recorder(Mutex<Vec<(String, Phase, bool)>>);

#[async_trait]
impl PhaseHook for Recorder {
	async fn after_phase(&self, item: &TestItem, report: &PhaseReport) {
		self.0
			.lock()
			.unwrap()
			.push((item.id().to_string(), report.phase, item.page().is_some()));
	}
}

struct SharedRecorder(Arc<Recorder>);

#[async_trait]
impl PhaseHook for SharedRecorder {
	async fn after_phase(&self, item: &TestItem, report: &PhaseReport) {
		self.0.after_phase(item, report).await;
	}
}

#[tokio::test]
async fn hooks_see_every_phase_in_order() {
	let dir = tempfile::tempdir().unwrap();
	let config = Arc::new(fast_config(dir.path()));
	let recorder = Arc::new(Recorder::default());
	let suite = Suite::bare(config.clone(), FakeEngine::new(Script::default()))
		.with_hook(Box::new(SharedRecorder(recorder.clone())));

	let report = suite.run_one(&Probe::new("m::hooked", Needs::Page, Body::Fail)).await;

	let seen = recorder.0.lock().unwrap().clone();
	assert_eq!(
		seen,
		vec![
			("m-hooked".to_string(), Phase::Setup, true),
			("m-hooked".to_string(), Phase::Call, true),
			("m-hooked".to_string(), Phase::Teardown, true),
		]
	);
	// no capture hook on a bare suite
	assert!(report.artifacts.is_empty());
	assert!(!config.html_dir().join("m-hooked.html").exists());
	assert_eq!(report.outcome, TestOutcome::Failed);
}

#[tokio::test]
async fn capture_hook_handles_failed_setup_once_per_phase() {
	let dir = tempfile::tempdir().unwrap();
	let config = fast_config(dir.path());
	let dirs = ArtifactDirs::from_config(&config);
	let engine = FakeEngine::new(Script::default());
	let context = engine.browser().new_context(&config.base_url).await.unwrap();
	let page = context.new_page().await.unwrap();
	let hook = ArtifactCaptureHook::new(dirs.clone());

	let mut broken = TestItem::new(QualifiedName::parse("m::setup_broke").unwrap(), Needs::Page);
	broken.bind_page(page.clone());
	let failed = PhaseReport {
		phase: Phase::Setup,
		outcome: PhaseOutcome::Failed("login page never loaded".into()),
		duration_ms: 3,
	};
	hook.after_phase(&broken, &failed).await;
	hook.after_phase(&broken, &failed).await;

	assert_eq!(broken.artifacts().len(), 2);
	assert_eq!(engine.log.count("screenshot"), 1);
	assert!(dirs.html_path("m-setup_broke").is_file());

	let mut fine = TestItem::new(QualifiedName::parse("m::setup_fine").unwrap(), Needs::Page);
	fine.bind_page(page);
	let passed = PhaseReport {
		phase: Phase::Setup,
		outcome: PhaseOutcome::Passed,
		duration_ms: 3,
	};
	hook.after_phase(&fine, &passed).await;
	assert!(fine.artifacts().is_empty());
	assert!(!dirs.html_path("m-setup_fine").exists());
}
