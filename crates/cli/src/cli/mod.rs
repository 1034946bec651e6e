
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand, ValueEnum};
use repos_harness::config::{BrowserKind, HarnessConfig};
use url::Url;

/// Browser suite for the Nextcloud repos app.
#[derive(Parser, Debug)]
#[command(name = "repos-e2e")]
#[command(about = "Browser end-to-end tests for the Nextcloud repos app")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// JSON config file; flags and environment override its values
	#[arg(short, long, global = true, value_name = "FILE", env = "REPOS_E2E_CONFIG")]
	pub config: Option<PathBuf>,

	#[command(flatten)]
	pub overrides: ConfigOverrides,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run the suite, or the scenarios matching a filter.
	Run(RunArgs),
	/// List scenarios without running them.
	List,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	/// Only run scenarios whose qualified name contains this text.
	#[arg(long, value_name = "TEXT")]
	pub filter: Option<String>,

	/// Report format.
	#[arg(short = 'f', long, value_enum, default_value = "text")]
	pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// One line per test plus a summary
	#[default]
	Text,
	/// The full suite report as JSON
	Json,
}

/// Per-run overrides of the loaded configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
	/// Nextcloud base URL
	#[arg(long, global = true, value_name = "URL", env = "REPOS_E2E_BASE_URL")]
	pub base_url: Option<Url>,

	#[arg(long, global = true, env = "REPOS_E2E_USERNAME")]
	pub username: Option<String>,

	#[arg(long, global = true, env = "REPOS_E2E_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,

	/// Repository folder the scenarios look for
	#[arg(long, global = true, value_name = "NAME", env = "REPOS_E2E_REPO_NAME")]
	pub repo_name: Option<String>,

	/// Root directory for screenshots and HTML dumps
	#[arg(long, global = true, value_name = "DIR", env = "REPOS_E2E_ARTIFACTS_DIR")]
	pub artifacts_dir: Option<PathBuf>,

	/// Browser engine: chromium, firefox or webkit
	#[arg(long, global = true, env = "REPOS_E2E_BROWSER")]
	pub browser: Option<BrowserKind>,

	/// Show the browser window
	#[arg(long, global = true)]
	pub headed: bool,
}

impl ConfigOverrides {
	pub fn apply(&self, config: &mut HarnessConfig) {
		if let Some(url) = &self.base_url {
			config.base_url = url.clone();
		}
		if let Some(username) = &self.username {
			config.username = username.clone();
		}
		if let Some(password) = &self.password {
			config.password = password.clone();
		}
		if let Some(repo) = &self.repo_name {
			config.repo_name = repo.clone();
		}
		if let Some(dir) = &self.artifacts_dir {
			config.artifacts.root = dir.clone();
		}
		if let Some(kind) = self.browser {
			config.browser.kind = kind;
		}
		if self.headed {
			config.browser.headless = false;
		}
	}
}

/// Cargo-like help colors.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}
