//! Small helpers for building and decoding page scripts.

use serde::de::DeserializeOwned;

use crate::error::{HarnessError, Result};

/// Encodes `value` as a JavaScript string literal.
pub fn quote(value: &str) -> String {
	serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
}

/// Expression that is `true` when `selector` matches at least one element.
pub fn exists(selector: &str) -> String {
	format!("document.querySelector({}) !== null", quote(selector))
}

/// Strips one layer of JSON string quoting when the driver returned a quoted value.
pub fn unquote(raw: &str) -> String {
	let trimmed = raw.trim();
	if trimmed.starts_with('"') {
		if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
			return inner;
		}
	}
	trimmed.to_string()
}

/// Interprets an evaluation result as a boolean.
pub fn truthy(raw: &str) -> bool {
	unquote(raw) == "true"
}

/// Decodes the result of a `JSON.stringify(...)` expression.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
	let body = unquote(raw);
	serde_json::from_str(&body).map_err(|e| HarnessError::JsEval(format!("unexpected script result {body:?}: {e}")))
}
