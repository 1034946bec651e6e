//! Minimal WebDAV client for reachability checks.

use reqwest::{Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

const DAV_ROOT: [&str; 3] = ["remote.php", "dav", "files"];

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/><d:getlastmodified/></d:prop></d:propfind>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
	Zero,
	One,
}

impl Depth {
	fn as_str(self) -> &'static str {
		match self {
			Depth::Zero => "0",
			Depth::One => "1",
		}
	}
}

/// Basic-auth WebDAV client scoped to one user's files.
#[derive(Debug, Clone)]
pub struct WebDavClient {
	http: reqwest::Client,
	base_url: Url,
	username: String,
	password: String,
}

impl WebDavClient {
	pub fn new(config: &HarnessConfig) -> Result<Self> {
		Self::with_credentials(config, &config.username, &config.password)
	}

	/// Same endpoint, different credentials.
	pub fn with_credentials(config: &HarnessConfig, username: &str, password: &str) -> Result<Self> {
		let http = reqwest::Client::builder().timeout(config.webdav_timeout).build()?;
		Ok(Self {
			http,
			base_url: config.base_url.clone(),
			username: username.to_string(),
			password: password.to_string(),
		})
	}

	/// `{base}/remote.php/dav/files/{user}/{path}/`, each segment percent-encoded.
	pub fn collection_url(&self, path: &str) -> Result<Url> {
		let mut url = self.base_url.clone();
		url.set_query(None);
		url.set_fragment(None);
		{
			let mut segments = url
				.path_segments_mut()
				.map_err(|_| HarnessError::Config(format!("base URL {} cannot carry a path", self.base_url)))?;
			segments.pop_if_empty();
			segments.extend(DAV_ROOT);
			segments.push(&self.username);
			segments.extend(path.split('/').filter(|s| !s.is_empty()));
			segments.push("");
		}
		Ok(url)
	}

	/// Issues `PROPFIND` against a collection and returns the response status.
	///
	/// Only transport failures are errors; any HTTP status is returned as-is.
	pub async fn propfind(&self, path: &str, depth: Depth) -> Result<StatusCode> {
		let url = self.collection_url(path)?;
		let method = Method::from_bytes(b"PROPFIND").map_err(|e| HarnessError::Config(e.to_string()))?;

		let response = self
			.http
			.request(method, url.clone())
			.basic_auth(&self.username, Some(&self.password))
			.header("Depth", depth.as_str())
			.header("Content-Type", "application/xml; charset=utf-8")
			.body(PROPFIND_BODY)
			.send()
			.await?;

		let status = response.status();
		debug!(target = "repos", url = %url, status = %status, "PROPFIND");
		Ok(status)
	}
}

/// 207 Multi-Status is the normal PROPFIND answer; some proxies turn it into 200.
pub fn is_reachable(status: StatusCode) -> bool {
	status == StatusCode::MULTI_STATUS || status == StatusCode::OK
}
