// src/exec/poller.rs

//! Marker-file lifecycle poller.
//!
//! Batch schedulers give no reliable push notification, so task state is
//! inferred from files the wrapper writes into the work directory:
//!
//! - start marker exists → the wrapper began executing
//! - exit marker exists → the wrapper finished; its content is the exit status
//!
//! Both checks run under the task's own lock, so polling the same task from
//! several threads never duplicates or loses a transition. A missing marker is
//! not an error: the check returns `false` and the caller polls again later.
//!
//! Ordering is strict: a task is only seen as completed after it has been
//! seen as started, even if the exit marker shows up first.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::GridError;
use crate::fs::FileSystem;
use crate::task::{Task, TaskStatus};

/// Exit status reported when the exit marker cannot be parsed.
pub const UNKNOWN_EXIT_STATUS: i32 = i32::MAX;

/// Reads marker files and advances task state.
#[derive(Debug, Clone)]
pub struct TaskPoller {
    fs: Arc<dyn FileSystem>,
    echo: bool,
    valid_exit_codes: Vec<i32>,
}

impl TaskPoller {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            echo: false,
            valid_exit_codes: vec![0],
        }
    }

    /// Copy the captured output to this process's stdout on completion.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_valid_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.valid_exit_codes = codes;
        self
    }

    pub fn is_valid_exit_code(&self, code: i32) -> bool {
        self.valid_exit_codes.contains(&code)
    }

    /// Has the wrapper started running?
    ///
    /// Returns `true` immediately once the task is `Started` or later. A
    /// `Submitted` task moves to `Started` the first time its start marker is
    /// seen, recording the marker's modification time as the start time.
    pub fn check_started(&self, task: &Task) -> bool {
        let mut state = task.lock_state();

        if state.status >= TaskStatus::Started {
            return true;
        }
        if state.status < TaskStatus::Submitted {
            return false;
        }

        let Some(handler) = state.handler.as_ref() else {
            return false;
        };
        let marker = handler.start_marker().to_path_buf();

        if !self.fs.exists(&marker) {
            return false;
        }

        let started_at = match self.fs.modified(&marker) {
            Ok(t) => Some(t),
            Err(e) => {
                debug!(task = %task.name(), error = %e, "cannot read start marker time");
                None
            }
        };

        state.started_at = started_at;
        state.status = TaskStatus::Started;
        info!(task = %task.name(), "task started");
        true
    }

    /// Has the wrapper finished?
    ///
    /// Returns `true` immediately once `Terminated`. Otherwise the task must
    /// already be `Started` and its exit marker must exist. On the first such
    /// observation the output is echoed (if enabled), the completion time and
    /// exit status are recorded, stdout is bound to the captured-output file
    /// and the task becomes `Terminated`.
    pub fn check_completed(&self, task: &Task) -> bool {
        let mut state = task.lock_state();

        if state.status == TaskStatus::Terminated {
            return true;
        }
        if state.status < TaskStatus::Started {
            return false;
        }

        let Some(handler) = state.handler.as_mut() else {
            return false;
        };
        let exit_marker = handler.exit_marker().to_path_buf();
        let output_file = handler.output_file().to_path_buf();

        if !self.fs.exists(&exit_marker) {
            return false;
        }

        let exit_status =
            handler.exit_status_or_insert_with(|| self.read_exit_status(task.name(), &exit_marker));

        if self.echo {
            self.echo_output(task.name(), &output_file);
        }

        let completed_at = match self.fs.modified(&exit_marker) {
            Ok(t) => Some(t),
            Err(e) => {
                debug!(task = %task.name(), error = %e, "cannot read exit marker time");
                None
            }
        };

        state.completed_at = completed_at;
        state.exit_code = Some(exit_status);
        state.stdout = Some(output_file);
        state.status = TaskStatus::Terminated;

        info!(task = %task.name(), exit_code = exit_status, "task completed");
        true
    }

    /// Which output file to report for a terminated task.
    ///
    /// With a valid exit code only a non-empty primary file counts. With an
    /// invalid one the scheduler's own output is the fallback, so a failed
    /// task that wrote nothing anywhere reports `None`.
    pub fn select_stdout(&self, task: &Task) -> Option<PathBuf> {
        let state = task.lock_state();
        let handler = state.handler.as_ref()?;
        let primary = state
            .stdout
            .clone()
            .unwrap_or_else(|| handler.output_file().to_path_buf());
        let secondary = handler.scheduler_output().to_path_buf();
        let exit_code = state.exit_code;
        drop(state);

        if self.fs.is_non_empty(&primary) {
            return Some(primary);
        }

        let valid = exit_code.map(|c| self.is_valid_exit_code(c)).unwrap_or(false);
        if !valid && self.fs.is_non_empty(&secondary) {
            return Some(secondary);
        }

        None
    }

    /// Parse the exit marker; anything unreadable becomes
    /// [`UNKNOWN_EXIT_STATUS`] after a warning.
    fn read_exit_status(&self, task: &str, path: &Path) -> i32 {
        let parsed = self
            .fs
            .read_to_string(path)
            .map_err(GridError::from)
            .and_then(|content| {
                content
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| GridError::ExitCodeParse {
                        path: path.to_path_buf(),
                        content,
                    })
            });

        match parsed {
            Ok(code) => code,
            Err(e) => {
                warn!(task = %task, error = %e, "unable to read exit status; using sentinel");
                UNKNOWN_EXIT_STATUS
            }
        }
    }

    fn echo_output(&self, task: &str, path: &Path) {
        let mut reader = match self.fs.open_read(path) {
            Ok(r) => r,
            Err(e) => {
                warn!(task = %task, error = %e, "output file missing; nothing to echo");
                return;
            }
        };

        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = std::io::copy(&mut reader, &mut lock).and_then(|_| lock.flush()) {
            warn!(task = %task, error = %e, "failed to echo task output");
        }
    }
}
