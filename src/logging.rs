// src/logging.rs

//! Logging setup for `gridrun` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level`, applied to every target
//! 2. `GRIDRUN_LOG`, full `EnvFilter` syntax (e.g. `info,gridrun::exec=debug`)
//! 3. `info`
//!
//! Events go to stderr; stdout is reserved for echoed task output and the
//! dry-run listing.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable read when no `--log-level` is given.
pub const LOG_ENV: &str = "GRIDRUN_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

/// Filter for the given CLI level and raw `GRIDRUN_LOG` value.
///
/// An unparsable `GRIDRUN_LOG` is an error.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(directive(level)));
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(spec) => EnvFilter::try_new(spec)
            .map_err(|e| anyhow!("invalid {LOG_ENV} value '{spec}': {e}")),
        None => Ok(EnvFilter::new("info")),
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
