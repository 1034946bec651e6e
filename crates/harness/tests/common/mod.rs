//! Scripted in-memory browser driver for fixture tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use repos_harness::config::{BrowserOptions, HarnessConfig, PollConfig, Selectors, Timeouts};
use repos_harness::driver::{BrowserInstance, Engine, LoadMilestone, PageHandle, SessionContext};
use repos_harness::error::{HarnessError, Result};
use url::Url;

/// How the fake instance behaves.
#[derive(Debug, Clone)]
pub struct Script {
	/// Unauthenticated contexts are shown the login form.
	pub login_form: bool,
	/// Submitting the form with a password authenticates the context.
	pub accept_login: bool,
	/// The readiness marker renders once authenticated.
	pub ready: bool,
	pub fail_goto: bool,
	pub fail_fill: bool,
	pub fail_screenshot: bool,
	pub fail_context_close: bool,
	/// Extra selectors reported visible.
	pub visible: Vec<String>,
	pub content: String,
	/// Result of the app-list script.
	pub app_row: String,
	/// URL loaded by any click, including clicks by text.
	pub click_target: Option<String>,
	/// Whether a click-by-text script finds an element.
	pub text_match: bool,
	/// URL the browser lands on when asked for `apps/files/`.
	pub files_redirect: Option<String>,
}

impl Default for Script {
	fn default() -> Self {
		Self {
			login_form: true,
			accept_login: true,
			ready: true,
			fail_goto: false,
			fail_fill: false,
			fail_screenshot: false,
			fail_context_close: false,
			visible: Vec::new(),
			content: "<html><body><div id=\"header\"></div></body></html>".to_string(),
			app_row: r#"{"present":false,"enabled":false}"#.to_string(),
			click_target: None,
			text_match: false,
			files_redirect: None,
		}
	}
}

/// Ordered record of driver calls.
#[derive(Debug, Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
	pub fn push(&self, entry: impl Into<String>) {
		self.0.lock().unwrap().push(entry.into());
	}

	pub fn entries(&self) -> Vec<String> {
		self.0.lock().unwrap().clone()
	}

	pub fn count(&self, prefix: &str) -> usize {
		self.entries().iter().filter(|e| e.starts_with(prefix)).count()
	}

	pub fn position(&self, entry: &str) -> Option<usize> {
		self.entries().iter().position(|e| e == entry)
	}
}

pub struct FakeEngine {
	pub script: Arc<Script>,
	pub log: Arc<CallLog>,
}

impl FakeEngine {
	pub fn new(script: Script) -> Arc<Self> {
		Arc::new(Self {
			script: Arc::new(script),
			log: Arc::new(CallLog::default()),
		})
	}

	pub fn browser(&self) -> FakeBrowser {
		FakeBrowser {
			script: self.script.clone(),
			log: self.log.clone(),
		}
	}
}

#[async_trait]
impl Engine for FakeEngine {
	async fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn BrowserInstance>> {
		self.log.push(format!("launch {}", options.kind));
		Ok(Box::new(self.browser()))
	}

	async fn shutdown(&self) -> Result<()> {
		self.log.push("engine.shutdown");
		Ok(())
	}
}

pub struct FakeBrowser {
	script: Arc<Script>,
	log: Arc<CallLog>,
}

#[async_trait]
impl BrowserInstance for FakeBrowser {
	async fn new_context(&self, base_url: &Url) -> Result<Box<dyn SessionContext>> {
		self.log.push("context.new");
		Ok(Box::new(FakeContext {
			base_url: base_url.clone(),
			script: self.script.clone(),
			log: self.log.clone(),
			authenticated: Arc::new(AtomicBool::new(false)),
		}))
	}

	async fn close(&self) -> Result<()> {
		self.log.push("browser.close");
		Ok(())
	}
}

pub struct FakeContext {
	base_url: Url,
	script: Arc<Script>,
	log: Arc<CallLog>,
	authenticated: Arc<AtomicBool>,
}

#[async_trait]
impl SessionContext for FakeContext {
	fn base_url(&self) -> &Url {
		&self.base_url
	}

	async fn new_page(&self) -> Result<Arc<dyn PageHandle>> {
		self.log.push("page.new");
		Ok(Arc::new(FakePage {
			base_url: self.base_url.clone(),
			script: self.script.clone(),
			log: self.log.clone(),
			authenticated: self.authenticated.clone(),
			selectors: Selectors::default(),
			url: Mutex::new("about:blank".to_string()),
			values: Mutex::new(HashMap::new()),
		}))
	}

	async fn close(&self) -> Result<()> {
		self.log.push("context.close");
		if self.script.fail_context_close {
			return Err(HarnessError::Closed("context"));
		}
		Ok(())
	}
}

pub struct FakePage {
	base_url: Url,
	script: Arc<Script>,
	log: Arc<CallLog>,
	authenticated: Arc<AtomicBool>,
	selectors: Selectors,
	url: Mutex<String>,
	values: Mutex<HashMap<String, String>>,
}

impl FakePage {
	fn form_shown(&self) -> bool {
		self.script.login_form && !self.authenticated.load(Ordering::SeqCst)
	}

	fn ready(&self) -> bool {
		self.script.ready && !self.form_shown()
	}

	fn set_url(&self, url: String) {
		*self.url.lock().unwrap() = url;
	}
}

#[async_trait]
impl PageHandle for FakePage {
	fn url(&self) -> String {
		self.url.lock().unwrap().clone()
	}

	async fn goto(&self, url: &str, milestone: LoadMilestone, timeout: Duration) -> Result<()> {
		self.log.push(format!("goto {url} {milestone}"));
		if self.script.fail_goto {
			return Err(HarnessError::Timeout {
				ms: timeout.as_millis() as u64,
				condition: format!("navigation to {url}"),
			});
		}
		let landed = match &self.script.files_redirect {
			Some(target) if url.ends_with("/apps/files/") => target.clone(),
			_ if self.form_shown() => self.base_url.join("login").map(String::from).unwrap_or_else(|_| url.to_string()),
			_ => url.to_string(),
		};
		self.set_url(landed);
		Ok(())
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		let selector = selector.trim_end_matches(" >> nth=0");
		if selector == self.selectors.username_input || selector == self.selectors.password_input {
			return Ok(self.form_shown());
		}
		if selector == self.selectors.readiness_marker {
			return Ok(self.ready());
		}
		Ok(self.script.visible.iter().any(|v| v == selector))
	}

	async fn fill(&self, selector: &str, value: &str) -> Result<()> {
		self.log.push(format!("fill {selector}"));
		if self.script.fail_fill {
			return Err(HarnessError::ElementNotFound {
				selector: selector.to_string(),
			});
		}
		self.values.lock().unwrap().insert(selector.to_string(), value.to_string());
		Ok(())
	}

	async fn press(&self, selector: &str, key: &str) -> Result<()> {
		self.log.push(format!("press {selector} {key}"));
		let has_password = self.values.lock().unwrap().contains_key(&self.selectors.password_input);
		if selector == self.selectors.password_input && key == "Enter" && has_password && self.script.accept_login {
			self.authenticated.store(true, Ordering::SeqCst);
			self.set_url(self.base_url.join("apps/dashboard/").map(String::from).unwrap_or_default());
		}
		Ok(())
	}

	async fn click(&self, selector: &str) -> Result<()> {
		self.log.push(format!("click {selector}"));
		if let Some(target) = &self.script.click_target {
			self.set_url(target.clone());
		}
		Ok(())
	}

	async fn evaluate(&self, expression: &str) -> Result<String> {
		if expression.contains("localStorage") {
			let state = serde_json::json!({
				"origin": self.base_url.origin().ascii_serialization(),
				"cookies": "nc_session_id=abc; nc_token=def",
				"localStorage": {},
			});
			return Ok(state.to_string());
		}
		if expression.contains(".value ??") {
			let filled = self.values.lock().unwrap().contains_key(&self.selectors.password_input);
			return Ok(filled.to_string());
		}
		if expression.contains("repositor") {
			return Ok(self.script.app_row.clone());
		}
		if expression.contains("querySelectorAll('a, span, div')") {
			self.log.push("click-by-text");
			if self.script.text_match {
				if let Some(target) = &self.script.click_target {
					self.set_url(target.clone());
				}
			}
			return Ok(self.script.text_match.to_string());
		}
		if expression.starts_with("document.querySelector(") {
			let username = serde_json::to_string(&self.selectors.username_input).unwrap();
			if expression.contains(&username) {
				return Ok(self.form_shown().to_string());
			}
			return Ok("false".to_string());
		}
		Err(HarnessError::JsEval(format!("unscripted expression: {expression}")))
	}

	async fn content(&self) -> Result<String> {
		Ok(self.script.content.clone())
	}

	async fn screenshot(&self) -> Result<Vec<u8>> {
		self.log.push("screenshot");
		if self.script.fail_screenshot {
			return Err(HarnessError::Closed("page"));
		}
		Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
	}

	async fn close(&self) -> Result<()> {
		self.log.push("page.close");
		Ok(())
	}
}

/// Config with millisecond budgets and every output path under `root`.
pub fn fast_config(root: &Path) -> HarnessConfig {
	let mut config = HarnessConfig::default();
	config.timeouts = Timeouts {
		page_load: Duration::from_millis(500),
		login_probe: Duration::from_millis(60),
		readiness: Duration::from_millis(80),
		navigation: Duration::from_millis(80),
		settle: Duration::from_millis(40),
		element: Duration::from_millis(40),
		element_step: Duration::from_millis(20),
	};
	config.poll = PollConfig {
		initial: Duration::from_millis(1),
		max: Duration::from_millis(5),
	};
	config.artifacts.root = root.join("artifacts");
	config.artifacts.failure_screenshot = root.join("login-failure.png");
	config.artifacts.failure_html = root.join("login-failure.html");
	config
}
