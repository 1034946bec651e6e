//! Suite report rendering.


use std::fmt::Write as _;

use colored::Colorize;
use repos_harness::runner::{Scenario, SuiteReport, TestOutcome};

use crate::cli::OutputFormat;

/// Prints the report to stdout in the requested format.
pub fn print_report(report: &SuiteReport, format: OutputFormat) -> anyhow::Result<()> {
	match format {
		OutputFormat::Text => print!("{}", render_text(report)),
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
	}
	Ok(())
}

fn badge(outcome: TestOutcome) -> String {
	let label = format!("{:<12}", outcome.to_string());
	match outcome {
		TestOutcome::Passed => label.green().to_string(),
		TestOutcome::Failed => label.red().bold().to_string(),
		TestOutcome::Error => label.red().to_string(),
		TestOutcome::Inconclusive => label.yellow().to_string(),
	}
}

/// One line per test, artifacts indented below it, then a summary line.
pub fn render_text(report: &SuiteReport) -> String {
	let mut out = String::new();
	for test in &report.tests {
		let _ = write!(out, "{} {}", badge(test.outcome), test.name);
		if let Some(message) = &test.message {
			let _ = write!(out, " {}", format!("({message})").dimmed());
		}
		out.push('\n');
		for artifact in &test.artifacts {
			let _ = writeln!(out, "    {}", artifact.path.display().to_string().dimmed());
		}
	}

	let summary = format!(
		"{} passed, {} failed, {} errors, {} inconclusive",
		report.count(TestOutcome::Passed),
		report.count(TestOutcome::Failed),
		report.count(TestOutcome::Error),
		report.count(TestOutcome::Inconclusive),
	);
	let summary = if report.is_success() { summary.green() } else { summary.red() };
	let _ = writeln!(out, "\n{}", summary.bold());
	out
}

/// `name  needs  description` rows for `list`.
pub fn render_list(scenarios: &[&dyn Scenario]) -> String {
	let width = scenarios.iter().map(|s| s.name().as_str().len()).max().unwrap_or(0);
	let mut out = String::new();
	for scenario in scenarios {
		let needs = format!("{:?}", scenario.needs()).to_lowercase();
		let _ = writeln!(
			out,
			"{:<width$}  {:<7}  {}",
			scenario.name().as_str(),
			needs,
			scenario.description().dimmed()
		);
	}
	out
}
