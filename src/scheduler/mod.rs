// src/scheduler/mod.rs

//! Batch-scheduler dialects.
//!
//! Every supported batch system is one [`SchedulerDialect`] implementation
//! that knows how to spell a submit command and a kill command. The engine
//! picks a dialect from [`SchedulerKind`] at startup; nothing else in the
//! crate depends on a concrete scheduler.
//!
//! - [`local`]: detached background shell on this host.
//! - [`slurm`]: `sbatch` / `scancel`.
//! - [`sge`]: `qsub` / `qdel` (Grid Engine).
//! - [`pbs`]: `qsub` / `qdel` (PBS/Torque).
//! - [`lsf`]: `bsub` / `bkill`.

pub mod local;
pub mod lsf;
pub mod pbs;
pub mod sge;
pub mod slurm;

use std::fmt;
use std::path::PathBuf;

use crate::task::{MemorySize, ResourceRequest, Task, TimeSpan, WorkDirLayout};
use crate::types::SchedulerKind;

pub use local::LocalDialect;
pub use lsf::LsfDialect;
pub use pbs::PbsDialect;
pub use sge::SgeDialect;
pub use slurm::SlurmDialect;

/// Everything a dialect needs to build a submit command line.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub name: String,
    pub work_dir: PathBuf,
    pub wrapper: PathBuf,
    /// Where the scheduler should write the job's own stdout/stderr.
    pub scheduler_output: PathBuf,
    pub queue: Option<String>,
    pub cpus: Option<u32>,
    pub time: Option<ResourceRequest<TimeSpan>>,
    pub memory: Option<ResourceRequest<MemorySize>>,
    pub cluster_options: Vec<String>,
}

impl SubmitRequest {
    pub fn from_task(task: &Task, layout: &WorkDirLayout) -> Self {
        let spec = task.spec();
        Self {
            name: spec.name.clone(),
            work_dir: task.work_path().to_path_buf(),
            wrapper: task.work_path().join(&layout.wrapper),
            scheduler_output: task.work_path().join(&layout.scheduler_output),
            queue: spec.queue.clone(),
            cpus: spec.cpus,
            time: spec.time.clone(),
            memory: spec.memory.clone(),
            cluster_options: spec.cluster_options.clone(),
        }
    }

    /// Job name safe for every scheduler: `grid_` + name with anything other
    /// than `[A-Za-z0-9_.-]` replaced, cut to `max_len` characters.
    pub fn job_name(&self, max_len: usize) -> String {
        let sanitized: String = format!("grid_{}", self.name)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        sanitized.chars().take(max_len).collect()
    }

    pub(crate) fn wrapper_arg(&self) -> String {
        self.wrapper.to_string_lossy().into_owned()
    }

    pub(crate) fn output_arg(&self) -> String {
        self.scheduler_output.to_string_lossy().into_owned()
    }

    pub(crate) fn work_dir_arg(&self) -> String {
        self.work_dir.to_string_lossy().into_owned()
    }
}

/// One batch system's command-line syntax.
pub trait SchedulerDialect: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// argv that enqueues `req.wrapper`.
    fn submit_command(&self, req: &SubmitRequest) -> Vec<String>;

    /// argv that cancels `job_id`.
    fn kill_command(&self, job_id: &str) -> Vec<String>;

    /// Extract the native job id from the combined submit output.
    fn parse_job_id(&self, output: &str) -> Option<String> {
        last_non_blank_line(output)
    }
}

/// Last line of `output` that is not blank, trimmed.
pub fn last_non_blank_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Dialect implementation for `kind`.
pub fn dialect_for(kind: SchedulerKind) -> Box<dyn SchedulerDialect> {
    match kind {
        SchedulerKind::Local => Box::new(LocalDialect),
        SchedulerKind::Slurm => Box::new(SlurmDialect),
        SchedulerKind::Sge => Box::new(SgeDialect),
        SchedulerKind::Pbs => Box::new(PbsDialect),
        SchedulerKind::Lsf => Box::new(LsfDialect),
    }
}

/// Render an argv for logs and error messages.
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|a| crate::wrapper::shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}
