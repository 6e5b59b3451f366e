// src/engine/mod.rs

//! Orchestration engine for gridrun.
//!
//! Prepares [`Task`]s from validated specs (content hash + fresh work
//! directory) and drives them with [`Runtime`]:
//! - launch while fewer than `queue_size` tasks are in flight
//! - poll start/exit markers on every tick
//! - record finished tasks in the provenance graph
//! - cancel submitted jobs on Ctrl-C

pub mod runtime;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::errors::Result;
use crate::task::hash::compute_task_hash;
use crate::task::{Task, TaskSpec, WorkDirectory};

pub use runtime::Runtime;

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: String,
    pub hash: String,
    /// `false` when the scheduler never accepted the job.
    pub submitted: bool,
    /// Wrapper exit status, or the submit command's when not submitted.
    pub exit_code: Option<i32>,
    /// Exit code is in the valid set.
    pub success: bool,
    pub stdout: Option<PathBuf>,
}

impl TaskReport {
    pub(crate) fn not_submitted(task: &Task, exit_code: Option<i32>) -> Self {
        Self {
            name: task.name().to_string(),
            hash: task.hash().to_string(),
            submitted: false,
            exit_code,
            success: false,
            stdout: None,
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// In completion order. A cancelled run appends every unfinished task
    /// last, marked unsuccessful.
    pub tasks: Vec<TaskReport>,
    /// Provenance labels in dependency order.
    pub provenance: Vec<String>,
    /// The run stopped on Ctrl-C before every task finished. Cancel commands
    /// for in-flight jobs had exited by the time the run returned.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.success).count()
    }

    pub fn report(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Salt mixed into every task hash so separate runs get separate work
/// directories.
pub fn new_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", std::process::id(), nanos)
}

/// Hash each spec and allocate its work directory under `work_root`.
pub fn prepare_tasks(specs: &[TaskSpec], work_root: &Path, session: &str) -> Result<Vec<Arc<Task>>> {
    specs
        .iter()
        .map(|spec| {
            let hash = compute_task_hash(session, spec);
            let work_dir = WorkDirectory::allocate(work_root, &hash)?;
            debug!(task = %spec.name, work_dir = ?work_dir.path(), "prepared task");
            Ok(Arc::new(Task::new(spec.clone(), work_dir)))
        })
        .collect()
}
