//! End-to-end harness for the Nextcloud repos app.
//!
//! The core is the [`session::AuthenticatedSession`] fixture: a fresh browser
//! context, logged in when needed and checked for readiness before any test
//! touches it. Around it sit artifact capture after each test phase
//! ([`hook`]), the [`runner`] that drives fixtures per scenario, and the
//! [`scenarios`] themselves.
//!
//! The browser is reached through the traits in [`driver`];
//! [`driver::playwright`] is the production backend.

pub mod artifacts;
pub mod config;
pub mod driver;
pub mod error;
pub mod hook;
pub mod js;
pub mod runner;
pub mod scenarios;
pub mod session;
pub mod test_id;
pub mod wait;
pub mod webdav;

pub use artifacts::{Artifact, ArtifactDirs, ArtifactKind};
pub use config::{BrowserKind, HarnessConfig};
pub use driver::playwright::PlaywrightEngine;
pub use error::{HarnessError, Result};
pub use hook::{ArtifactCaptureHook, Phase, PhaseHook, PhaseOutcome, PhaseReport};
pub use runner::{Fixtures, Needs, Scenario, Suite, SuiteReport, TestOutcome, TestReport, Verdict};
pub use session::{AuthenticatedSession, LoginOutcome, StoredAuthState};
pub use test_id::{QualifiedName, TestId};
