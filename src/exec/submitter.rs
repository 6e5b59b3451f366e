// src/exec/submitter.rs

//! Runs the scheduler's submit command and records the native job id.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{GridError, Result};
use crate::exec::handler::Handler;
use crate::scheduler::{display_command, SchedulerDialect, SubmitRequest};
use crate::task::{Task, TaskStatus, WorkDirLayout};

/// Result of asking the scheduler to enqueue a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The scheduler accepted the job. `job_id` is unset when its output
    /// contained nothing usable.
    Submitted { job_id: Option<String> },
    /// The submit command exited non-zero.
    Failed {
        command: String,
        exit_code: i32,
        output: String,
    },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted { .. })
    }

    /// Turn a failed submission into [`GridError::Submit`].
    pub fn into_result(self) -> Result<Option<String>> {
        match self {
            SubmitOutcome::Submitted { job_id } => Ok(job_id),
            SubmitOutcome::Failed {
                command,
                exit_code,
                output,
            } => Err(GridError::Submit {
                command,
                exit_code,
                output,
            }),
        }
    }
}

/// Owns a child process until it has been waited on; kills and reaps it on
/// every other exit path.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn wait(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Submits task wrappers through a [`SchedulerDialect`].
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    dialect: Arc<dyn SchedulerDialect>,
    layout: WorkDirLayout,
    base_env: BTreeMap<String, String>,
}

impl JobSubmitter {
    pub fn new(dialect: Arc<dyn SchedulerDialect>, layout: WorkDirLayout) -> Self {
        Self {
            dialect,
            layout,
            base_env: BTreeMap::new(),
        }
    }

    /// Environment added to the submit process on top of the inherited one.
    pub fn with_base_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    pub fn dialect(&self) -> &dyn SchedulerDialect {
        self.dialect.as_ref()
    }

    /// The submit argv for `task`, without running it.
    pub fn submit_command(&self, task: &Task) -> Vec<String> {
        self.dialect
            .submit_command(&SubmitRequest::from_task(task, &self.layout))
    }

    /// Run the submit command for `task`.
    ///
    /// On success the job id is stored in the task's handler and the task
    /// moves to [`TaskStatus::Submitted`]. On a non-zero exit the captured
    /// output and exit code are stored on the task, whose status is left
    /// untouched. Only a failure to start the process is an `Err`.
    pub fn submit(&self, task: &Task) -> Result<SubmitOutcome> {
        let argv = self.submit_command(task);
        let command = display_command(&argv);

        let mut env = self.base_env.clone();
        env.extend(task.spec().env.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!(
            task = %task.name(),
            scheduler = self.dialect.name(),
            command = %command,
            "running submit command"
        );

        let (exit_code, output) = run_captured(&argv, task.work_path(), &env)?;

        let mut state = task.lock_state();
        if exit_code != 0 {
            warn!(
                task = %task.name(),
                exit_code,
                command = %command,
                output = %output.trim(),
                "submit command failed"
            );
            state.exit_code = Some(exit_code);
            state.submit_output = Some(output.clone());
            return Ok(SubmitOutcome::Failed {
                command,
                exit_code,
                output,
            });
        }

        let job_id = self.dialect.parse_job_id(&output);
        if job_id.is_none() {
            warn!(
                task = %task.name(),
                "submit command succeeded without printing a job id"
            );
        }

        let layout = &self.layout;
        state
            .handler
            .get_or_insert_with(|| Handler::new(task.work_path(), layout))
            .set_job_id(job_id.clone());
        if state.status < TaskStatus::Submitted {
            state.status = TaskStatus::Submitted;
        }

        info!(
            task = %task.name(),
            job_id = job_id.as_deref().unwrap_or("-"),
            scheduler = self.dialect.name(),
            "task submitted"
        );

        Ok(SubmitOutcome::Submitted { job_id })
    }
}

/// Spawn `argv` in `cwd` with stderr folded into stdout, and collect the
/// output until the process exits.
///
/// The merge is done by a tiny `sh` trampoline so both streams share one pipe
/// and keep their relative order.
pub fn run_captured(
    argv: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<(i32, String)> {
    let command = display_command(argv);

    let child = Command::new("sh")
        .arg("-c")
        .arg("exec 2>&1; exec \"$@\"")
        .arg("gridrun-submit")
        .args(argv)
        .current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| GridError::Spawn {
            command: command.clone(),
            source,
        })?;

    let mut guard = ChildGuard::new(child);

    let mut raw = Vec::new();
    if let Some(mut stdout) = guard.child.stdout.take() {
        stdout
            .read_to_end(&mut raw)
            .map_err(|source| GridError::Spawn {
                command: command.clone(),
                source,
            })?;
    }

    let status = guard.wait().map_err(|source| GridError::Spawn {
        command: command.clone(),
        source,
    })?;

    Ok((status.code().unwrap_or(-1), String::from_utf8_lossy(&raw).into_owned()))
}
