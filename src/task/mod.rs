// src/task/mod.rs

//! Task descriptors and their mutable execution state.
//!
//! - [`resource`] holds the request/limit value objects for time and memory.
//! - [`workdir`] defines the content-addressed work directory and the names
//!   of the control files inside it.
//! - [`hash`] computes task content hashes with blake3.

pub mod hash;
pub mod resource;
pub mod workdir;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::exec::handler::Handler;
use crate::types::StageMode;
use crate::wrapper::scratch::Scratch;

pub use resource::{MemorySize, ResourceRequest, ResourceSpec, TimeSpan};
pub use workdir::{WorkDirLayout, WorkDirectory};

/// Canonical task name type.
pub type TaskName = String;

/// Lifecycle of a task as seen by the engine.
///
/// Transitions only move forward: `New -> Submitted -> Started -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskStatus {
    /// Handler assigned; the scheduler has not accepted the job yet.
    New,
    /// The submit command succeeded.
    Submitted,
    /// The start marker was observed.
    Started,
    /// The exit marker was observed and read.
    Terminated,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::New => "NEW",
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Started => "STARTED",
            TaskStatus::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

/// An input file to place into the execution directory before running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Where the file lives now.
    pub source: PathBuf,
    /// Relative name inside the execution directory.
    pub stage_as: String,
}

impl InputFile {
    /// Stage `source` under its own file name.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let stage_as = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string_lossy().into_owned());
        Self { source, stage_as }
    }

    pub fn staged_as(source: impl Into<PathBuf>, stage_as: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            stage_as: stage_as.into(),
        }
    }
}

/// Everything the engine needs to know about what a task runs.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: TaskName,
    pub script: String,
    pub stdin: Option<String>,
    pub inputs: Vec<InputFile>,
    /// Glob patterns of files to copy back from a scratch directory.
    pub outputs: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub time: Option<ResourceRequest<TimeSpan>>,
    pub memory: Option<ResourceRequest<MemorySize>>,
    pub cpus: Option<u32>,
    pub queue: Option<String>,
    pub cluster_options: Vec<String>,
    pub scratch: Scratch,
    pub stage_mode: StageMode,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            stdin: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            env: BTreeMap::new(),
            time: None,
            memory: None,
            cpus: None,
            queue: None,
            cluster_options: Vec::new(),
            scratch: Scratch::Disabled,
            stage_mode: StageMode::default(),
        }
    }
}

/// Mutable part of a task, guarded by the task's own lock.
#[derive(Debug)]
pub struct TaskState {
    pub status: TaskStatus,
    /// Unset until the task terminates (or the submit command fails).
    pub exit_code: Option<i32>,
    pub handler: Option<Handler>,
    pub started_at: Option<SystemTime>,
    pub completed_at: Option<SystemTime>,
    /// Captured-output file bound on completion.
    pub stdout: Option<PathBuf>,
    /// Output of a failed submit command, kept for the user.
    pub submit_output: Option<String>,
}

impl Default for TaskState {
    fn default() -> Self {
        Self {
            status: TaskStatus::New,
            exit_code: None,
            handler: None,
            started_at: None,
            completed_at: None,
            stdout: None,
            submit_output: None,
        }
    }
}

/// A single execution attempt of a task.
///
/// Identity (spec + work directory) never changes; only [`TaskState`] is
/// mutated, always under the per-task lock.
#[derive(Debug)]
pub struct Task {
    spec: TaskSpec,
    work_dir: WorkDirectory,
    state: Mutex<TaskState>,
}

impl Task {
    pub fn new(spec: TaskSpec, work_dir: WorkDirectory) -> Self {
        Self {
            spec,
            work_dir,
            state: Mutex::new(TaskState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn work_dir(&self) -> &WorkDirectory {
        &self.work_dir
    }

    pub fn work_path(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn hash(&self) -> &str {
        self.work_dir.hash()
    }

    /// Lock the mutable state. A poisoned lock is recovered, since every
    /// writer leaves the state consistent between statements.
    pub fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> TaskStatus {
        self.lock_state().status
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.lock_state().exit_code
    }

    pub fn job_id(&self) -> Option<String> {
        self.lock_state()
            .handler
            .as_ref()
            .and_then(|h| h.job_id().map(str::to_string))
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.lock_state().started_at
    }

    pub fn completed_at(&self) -> Option<SystemTime> {
        self.lock_state().completed_at
    }

    pub fn submit_output(&self) -> Option<String> {
        self.lock_state().submit_output.clone()
    }
}
