// src/exec/handler.rs

use std::path::{Path, PathBuf};

use crate::task::WorkDirLayout;

/// Engine-private bookkeeping for one launched task.
///
/// Created when the task is launched and owned by the task's state for the
/// rest of its life. Only `job_id` and the exit-status cache change after
/// creation, both under the task lock.
#[derive(Debug, Clone)]
pub struct Handler {
    job_id: Option<String>,
    start_marker: PathBuf,
    exit_marker: PathBuf,
    output_file: PathBuf,
    scheduler_output: PathBuf,
    exit_status_computed: bool,
    exit_status: i32,
}

impl Handler {
    pub fn new(work_dir: &Path, layout: &WorkDirLayout) -> Self {
        Self {
            job_id: None,
            start_marker: work_dir.join(&layout.start_marker),
            exit_marker: work_dir.join(&layout.exit_marker),
            output_file: work_dir.join(&layout.output),
            scheduler_output: work_dir.join(&layout.scheduler_output),
            exit_status_computed: false,
            exit_status: 0,
        }
    }

    /// Native scheduler id; unset when the submit output held none.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub(crate) fn set_job_id(&mut self, job_id: Option<String>) {
        self.job_id = job_id;
    }

    pub fn start_marker(&self) -> &Path {
        &self.start_marker
    }

    pub fn exit_marker(&self) -> &Path {
        &self.exit_marker
    }

    /// Primary captured output (`.command.out`).
    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Legacy secondary output written by the scheduler (`.job.out`).
    pub fn scheduler_output(&self) -> &Path {
        &self.scheduler_output
    }

    /// Return the cached exit status or compute it with `read` and cache it.
    /// `read` is invoked at most once over the handler's lifetime.
    pub(crate) fn exit_status_or_insert_with(&mut self, read: impl FnOnce() -> i32) -> i32 {
        if !self.exit_status_computed {
            self.exit_status = read();
            self.exit_status_computed = true;
        }
        self.exit_status
    }
}
