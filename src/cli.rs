// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::SchedulerKind;

/// Command-line arguments for `gridrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gridrun",
    version,
    about = "Submit tasks to a batch scheduler and track them through marker files.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Gridrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Gridrun.toml")]
    pub config: String,

    /// Override `[executor].scheduler` from the config file.
    #[arg(long, value_name = "NAME", value_parser = parse_scheduler)]
    pub scheduler: Option<SchedulerKind>,

    /// Override `[executor].work_dir` from the config file.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GRIDRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print each task's submit command, but submit nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_scheduler(s: &str) -> Result<SchedulerKind, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
