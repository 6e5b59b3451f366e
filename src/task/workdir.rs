// src/task/workdir.rs

//! Per-task work directories and the names of the control files inside them.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::errors::Result;
use crate::task::hash::{rehash, split_hash};

/// Names of the control files written into every task work directory.
///
/// Passed to the wrapper builder and the poller so alternate layouts can be
/// used in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDirLayout {
    /// Normalized user script.
    pub script: String,
    /// Sourced shell environment.
    pub env: String,
    /// Optional stdin content piped into the script.
    pub stdin: String,
    /// Combined stdout + stderr of the user script.
    pub output: String,
    /// The wrapper submitted to the scheduler.
    pub wrapper: String,
    /// Zero-byte marker created as soon as the wrapper starts.
    pub start_marker: String,
    /// Final exit status of the wrapper.
    pub exit_marker: String,
    /// Output captured by the scheduler itself.
    pub scheduler_output: String,
}

impl Default for WorkDirLayout {
    fn default() -> Self {
        Self {
            script: ".command.sh".to_string(),
            env: ".command.env".to_string(),
            stdin: ".command.in".to_string(),
            output: ".command.out".to_string(),
            wrapper: ".job.run".to_string(),
            start_marker: ".job.started".to_string(),
            exit_marker: ".exitcode".to_string(),
            scheduler_output: ".job.out".to_string(),
        }
    }
}

/// Content-addressed directory owned by exactly one task.
///
/// The path is `<root>/<hash[..2]>/<hash[2..]>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDirectory {
    path: PathBuf,
    hash: String,
}

impl WorkDirectory {
    /// Directory for `hash` under `root`, without touching the filesystem.
    pub fn for_hash(root: &Path, hash: &str) -> Self {
        let (bucket, rest) = split_hash(hash);
        Self {
            path: root.join(bucket).join(rest),
            hash: hash.to_string(),
        }
    }

    /// Create a fresh work directory for `hash`.
    ///
    /// A directory that already exists is never reused: the hash is derived
    /// again with an attempt counter until an unused path is found.
    pub fn allocate(root: &Path, hash: &str) -> Result<Self> {
        let mut attempt = 0u32;
        let mut candidate = Self::for_hash(root, hash);

        loop {
            if let Some(parent) = candidate.path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating work bucket {:?}", parent))?;
            }

            match std::fs::create_dir(&candidate.path) {
                Ok(()) => {
                    debug!(path = ?candidate.path, attempt, "allocated work directory");
                    return Ok(candidate);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    debug!(
                        path = ?candidate.path,
                        attempt,
                        "work directory already exists; deriving a new hash"
                    );
                    candidate = Self::for_hash(root, &rehash(hash, attempt));
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("creating work directory {:?}", candidate.path))
                        .into());
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}
