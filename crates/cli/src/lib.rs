//! Command-line runner for the repos app browser suite.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
