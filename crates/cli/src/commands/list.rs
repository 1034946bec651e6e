use std::process::ExitCode;

use repos_harness::runner::select;
use repos_harness::scenarios;

use crate::output::render_list;

pub fn execute() -> anyhow::Result<ExitCode> {
	let all = scenarios::all()?;
	print!("{}", render_list(&select(&all, None)));
	Ok(ExitCode::SUCCESS)
}
