//! Authenticated session fixture.
//!
//! [`AuthenticatedSession::establish`] creates a fresh context on a browser
//! instance, logs in when the login form is shown, and only hands the
//! context out once the readiness marker is visible. The login attempt is
//! optimistic: its failures are recorded in [`LoginOutcome`] and logged,
//! and the readiness check decides whether the fixture fails.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::artifacts::{capture_html, capture_screenshot, ensure_dir};
use crate::config::HarnessConfig;
use crate::driver::{BrowserInstance, LoadMilestone, PageHandle, SessionContext};
use crate::error::{HarnessError, Result};
use crate::js;
use crate::wait::{poll_until, wait_for};

/// Which login branch the fixture took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum LoginOutcome {
	/// The form was shown, filled and submitted, and navigation followed.
	Succeeded,
	/// No login form appeared; the context is assumed to be authenticated.
	NotNeeded,
	/// The form was shown but filling or submitting it failed.
	Failed(String),
}

impl fmt::Display for LoginOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LoginOutcome::Succeeded => write!(f, "succeeded"),
			LoginOutcome::NotNeeded => write!(f, "not needed"),
			LoginOutcome::Failed(reason) => write!(f, "failed: {reason}"),
		}
	}
}

/// Cookies and local storage visible to the application after login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuthState {
	pub origin: String,
	/// `document.cookie` of the authenticated page. HttpOnly cookies are not included.
	pub cookies: String,
	pub local_storage: BTreeMap<String, String>,
}

impl StoredAuthState {
	pub fn cookie_names(&self) -> Vec<&str> {
		self.cookies
			.split(';')
			.filter_map(|pair| pair.split('=').next())
			.map(str::trim)
			.filter(|name| !name.is_empty())
			.collect()
	}
}

/// Result of one run of the login sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthReport {
	pub login: LoginOutcome,
	pub state: StoredAuthState,
}

/// What the login probe saw first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginProbe {
	FormPresent,
	FormAbsent,
}

const SNAPSHOT_SCRIPT: &str = "JSON.stringify({ origin: location.origin, cookies: document.cookie, \
	localStorage: Object.fromEntries(Object.keys(localStorage).map(k => [k, localStorage.getItem(k)])) })";

/// A context that has passed the readiness check.
///
/// Owns the context: [`close`](Self::close) consumes the session, so the
/// context is closed exactly once.
pub struct AuthenticatedSession {
	context: Box<dyn SessionContext>,
	config: Arc<HarnessConfig>,
	report: AuthReport,
}

impl AuthenticatedSession {
	/// Creates a new context on `browser` and authenticates it.
	///
	/// On failure the context is closed before the error is returned.
	pub async fn establish(browser: &dyn BrowserInstance, config: Arc<HarnessConfig>) -> Result<Self> {
		let context = browser.new_context(&config.base_url).await?;
		match authenticate_context(context.as_ref(), &config).await {
			Ok(report) => Ok(Self { context, config, report }),
			Err(err) => {
				if let Err(close_err) = context.close().await {
					warn!(target = "repos", error = %close_err, "failed to close context after fixture failure");
				}
				Err(err)
			}
		}
	}

	/// Runs the login sequence again on the same context.
	///
	/// Against a context that is still authenticated this takes the
	/// [`LoginOutcome::NotNeeded`] branch.
	pub async fn authenticate(&mut self) -> Result<&AuthReport> {
		self.report = authenticate_context(self.context.as_ref(), &self.config).await?;
		Ok(&self.report)
	}

	pub fn report(&self) -> &AuthReport {
		&self.report
	}

	pub fn login_outcome(&self) -> &LoginOutcome {
		&self.report.login
	}

	pub fn stored_state(&self) -> &StoredAuthState {
		&self.report.state
	}

	pub fn context(&self) -> &dyn SessionContext {
		self.context.as_ref()
	}

	/// Opens a page in the authenticated context.
	///
	/// Pages need no explicit close; they go away with the context.
	pub async fn new_page(&self) -> Result<Arc<dyn PageHandle>> {
		self.context.new_page().await
	}

	pub async fn close(self) -> Result<()> {
		debug!(target = "repos", base_url = %self.context.base_url(), "closing session context");
		self.context.close().await
	}
}

/// Logs `context` in through a transient page and captures its auth state.
///
/// Fatal failures leave diagnostics at the configured failure paths.
pub async fn authenticate_context(context: &dyn SessionContext, config: &HarnessConfig) -> Result<AuthReport> {
	let page = context.new_page().await?;

	match login_sequence(page.as_ref(), config).await {
		Ok(report) => {
			persist_auth_state(config, &report.state).await;
			if let Err(e) = page.close().await {
				warn!(target = "repos", error = %e, "failed to close login page");
			}
			Ok(report)
		}
		Err(err) => {
			capture_failure_diagnostics(page.as_ref(), config).await;
			if let Err(e) = page.close().await {
				warn!(target = "repos", error = %e, "failed to close login page");
			}
			Err(err)
		}
	}
}

async fn login_sequence(page: &dyn PageHandle, config: &HarnessConfig) -> Result<AuthReport> {
	let start_url = config.url("");
	let page_load = config.timeouts.page_load;
	page.goto(&start_url, LoadMilestone::DomContentLoaded, page_load)
		.await
		.map_err(|source| HarnessError::PageLoad {
			url: start_url.clone(),
			ms: page_load.as_millis() as u64,
			source: Box::new(source),
		})?;

	let login = attempt_login(page, config).await;
	match &login {
		LoginOutcome::Failed(reason) => warn!(target = "repos", reason = %reason, url = %page.url(), "login attempt failed"),
		other => debug!(target = "repos", login = %other, "login branch finished"),
	}

	let marker = config.selectors.readiness_marker.as_str();
	let readiness = config.timeouts.readiness;
	wait_for(marker, readiness, config.poll, || page.is_visible(marker))
		.await
		.map_err(|_| HarnessError::Readiness {
			selector: marker.to_string(),
			ms: readiness.as_millis() as u64,
			login: login.clone(),
		})?;

	let state: StoredAuthState = js::decode(&page.evaluate(SNAPSHOT_SCRIPT).await?)?;
	info!(
		target = "repos",
		login = %login,
		url = %page.url(),
		cookies = state.cookie_names().len(),
		"session authenticated"
	);

	Ok(AuthReport { login, state })
}

/// Fills and submits the login form when it is shown. Never fails.
async fn attempt_login(page: &dyn PageHandle, config: &HarnessConfig) -> LoginOutcome {
	match probe_login_form(page, config).await {
		LoginProbe::FormAbsent => LoginOutcome::NotNeeded,
		LoginProbe::FormPresent => match submit_login(page, config).await {
			Ok(()) => LoginOutcome::Succeeded,
			Err(e) => LoginOutcome::Failed(e.to_string()),
		},
	}
}

/// Waits for whichever renders first: the login form or the readiness marker.
async fn probe_login_form(page: &dyn PageHandle, config: &HarnessConfig) -> LoginProbe {
	let user = config.selectors.username_input.as_str();
	let marker = config.selectors.readiness_marker.as_str();

	let probe = poll_until("login form or readiness marker", config.timeouts.login_probe, config.poll, || async move {
		if page.is_visible(user).await? {
			return Ok(Some(LoginProbe::FormPresent));
		}
		if page.is_visible(marker).await? {
			return Ok(Some(LoginProbe::FormAbsent));
		}
		Ok(None)
	})
	.await;

	match probe {
		Ok(found) => found,
		Err(e) => {
			debug!(target = "repos", error = %e, "login form never became visible");
			LoginProbe::FormAbsent
		}
	}
}

async fn submit_login(page: &dyn PageHandle, config: &HarnessConfig) -> Result<()> {
	let selectors = &config.selectors;
	page.fill(&selectors.username_input, &config.username).await?;
	page.fill(&selectors.password_input, &config.password).await?;

	let filled = format!(
		"(document.querySelector({})?.value ?? '').length > 0",
		js::quote(&selectors.password_input)
	);
	let filled = filled.as_str();
	wait_for("password input filled", config.timeouts.settle, config.poll, || async move {
		Ok(js::truthy(&page.evaluate(filled).await?))
	})
	.await?;

	// URL captured before the key press, so a fast navigation cannot be missed.
	let before = page.url();
	page.press(&selectors.password_input, "Enter").await?;

	let form_gone = js::exists(&selectors.username_input);
	let form_gone = form_gone.as_str();
	let before = before.as_str();
	wait_for("navigation after login submit", config.timeouts.navigation, config.poll, || async move {
		if page.url() != before {
			return Ok(true);
		}
		Ok(!js::truthy(&page.evaluate(form_gone).await?))
	})
	.await
}

async fn capture_failure_diagnostics(page: &dyn PageHandle, config: &HarnessConfig) {
	let artifacts = &config.artifacts;
	let screenshot = capture_screenshot(page, &artifacts.failure_screenshot).await;
	let html = capture_html(page, &artifacts.failure_html).await;
	error!(
		target = "repos",
		url = %page.url(),
		screenshot = screenshot.is_some(),
		html = html.is_some(),
		screenshot_path = %artifacts.failure_screenshot.display(),
		html_path = %artifacts.failure_html.display(),
		"session fixture failed"
	);
}

async fn persist_auth_state(config: &HarnessConfig, state: &StoredAuthState) {
	let Some(path) = &config.artifacts.auth_state else {
		return;
	};

	let result = async {
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				ensure_dir(parent)?;
			}
		}
		let json = serde_json::to_vec_pretty(state)?;
		tokio::fs::write(path, json).await?;
		Ok::<_, HarnessError>(())
	}
	.await;

	match result {
		Ok(()) => debug!(target = "repos", path = %path.display(), "auth state saved"),
		Err(e) => warn!(target = "repos", path = %path.display(), error = %e, "failed to save auth state"),
	}
}
