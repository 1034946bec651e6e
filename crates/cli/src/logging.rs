use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default directives per `-v` count. `RUST_LOG` replaces them entirely.
pub fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		// login fallbacks and capture failures only
		0 => "warn,playwright_rs=error",
		1 => "info,playwright_rs=warn",
		_ => "debug,repos=trace",
	}
}

/// Installs the stderr subscriber. Reports go to stdout, so logs never mix into them.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
	let ansi = std::io::stderr().is_terminal();

	let installed = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_ansi(ansi)
		.with_target(verbosity > 0)
		.compact()
		.try_init();

	if let Err(e) = installed {
		eprintln!("logging already initialised: {e}");
	}
}
