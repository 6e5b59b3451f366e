// src/errors.rs

//! Crate-wide error type and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The scheduler's submit command ran but exited non-zero.
    ///
    /// `output` keeps the combined stdout/stderr of the submit command so the
    /// user can see why the scheduler rejected the job.
    #[error("Submit command `{command}` failed with exit code {exit_code}: {output}")]
    Submit {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Failed to spawn submit command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The exit marker exists but does not hold an integer.
    #[error("Unable to parse exit status from {path:?}: {content:?}")]
    ExitCodeParse { path: PathBuf, content: String },

    #[error("{0} task(s) terminated with an invalid exit status")]
    TasksFailed(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GridError {
    /// Shorthand for building a [`GridError::ConfigError`].
    pub fn config(msg: impl Into<String>) -> Self {
        GridError::ConfigError(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GridError>;
