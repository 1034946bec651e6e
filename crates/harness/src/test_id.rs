//! Filesystem-safe test identifiers.
//!
//! A [`TestId`] links a test invocation to its artifacts: `<id>.png` and
//! `<id>.html`. It is derived from the fully-qualified test name by
//! replacing `::`, `/` and `.` with `-`. Step snapshots append `@<step>`;
//! no test id can contain `@`, so a step name never collides with another
//! test's id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

const STEP_SEPARATOR: char = '@';

/// Sanitized artifact key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
	/// Derives an identifier from any fully-qualified name.
	pub fn from_qualified(name: &str) -> Self {
		let id = name.replace("::", "-").replace(['/', '.'], "-");
		Self(id)
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Identifier for an intermediate snapshot (`<id>@<step>`).
	pub fn step(&self, step: &str) -> String {
		let step = TestId::from_qualified(step).0.replace(STEP_SEPARATOR, "-");
		format!("{}{STEP_SEPARATOR}{step}", self.0)
	}
}

impl fmt::Display for TestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Validated `::`-separated test name (`module::submodule::test_name`).
///
/// Segments are restricted to `[A-Za-z0-9_]`, so no segment can contain the
/// delimiter and distinct names always map to distinct [`TestId`]s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName(String);

impl QualifiedName {
	pub fn parse(name: &str) -> Result<Self> {
		if name.is_empty() {
			return Err(HarnessError::Config("test name must not be empty".into()));
		}
		for segment in name.split("::") {
			if segment.is_empty() {
				return Err(HarnessError::Config(format!("empty segment in test name {name:?}")));
			}
			if let Some(bad) = segment.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
				return Err(HarnessError::Config(format!("invalid character {bad:?} in test name {name:?}")));
			}
		}
		Ok(Self(name.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn segments(&self) -> impl Iterator<Item = &str> {
		self.0.split("::")
	}

	/// Last segment, the test function itself.
	pub fn leaf(&self) -> &str {
		self.segments().last().unwrap_or(&self.0)
	}

	pub fn test_id(&self) -> TestId {
		TestId::from_qualified(&self.0)
	}
}

impl fmt::Display for QualifiedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl TryFrom<String> for QualifiedName {
	type Error = HarnessError;

	fn try_from(value: String) -> Result<Self> {
		QualifiedName::parse(&value)
	}
}

impl From<QualifiedName> for String {
	fn from(value: QualifiedName) -> Self {
		value.0
	}
}
