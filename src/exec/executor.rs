// src/exec/executor.rs

//! The orchestrator-facing executor: launch, poll, report and kill.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::handler::Handler;
use crate::exec::poller::TaskPoller;
use crate::exec::submitter::{run_captured, JobSubmitter, SubmitOutcome};
use crate::fs::FileSystem;
use crate::scheduler::{display_command, SchedulerDialect};
use crate::task::{Task, WorkDirLayout};
use crate::wrapper::builder::DEFAULT_SHELL;
use crate::wrapper::JobWrapperBuilder;

/// Grid executor bound to one scheduler dialect.
///
/// Safe to share across threads: every method takes `&self` and all per-task
/// mutation happens under the task's own lock.
#[derive(Debug, Clone)]
pub struct GridExecutor {
    dialect: Arc<dyn SchedulerDialect>,
    layout: WorkDirLayout,
    fs: Arc<dyn FileSystem>,
    wrapper: JobWrapperBuilder,
    submitter: JobSubmitter,
    poller: TaskPoller,
}

/// Collects the executor settings before the components are wired together.
#[derive(Debug, Clone)]
pub struct GridExecutorBuilder {
    dialect: Arc<dyn SchedulerDialect>,
    fs: Arc<dyn FileSystem>,
    layout: WorkDirLayout,
    shell: String,
    env: BTreeMap<String, String>,
    echo: bool,
    valid_exit_codes: Vec<i32>,
}

impl GridExecutorBuilder {
    pub fn layout(mut self, layout: WorkDirLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Environment exported to every task and to the submit command.
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn valid_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.valid_exit_codes = codes;
        self
    }

    pub fn build(self) -> GridExecutor {
        let wrapper = JobWrapperBuilder::new(self.layout.clone())
            .with_shell(self.shell)
            .with_base_env(self.env.clone());
        let submitter =
            JobSubmitter::new(self.dialect.clone(), self.layout.clone()).with_base_env(self.env);
        let poller = TaskPoller::new(self.fs.clone())
            .with_echo(self.echo)
            .with_valid_exit_codes(self.valid_exit_codes);

        GridExecutor {
            dialect: self.dialect,
            layout: self.layout,
            fs: self.fs,
            wrapper,
            submitter,
            poller,
        }
    }
}

impl GridExecutor {
    pub fn builder(
        dialect: Arc<dyn SchedulerDialect>,
        fs: Arc<dyn FileSystem>,
    ) -> GridExecutorBuilder {
        GridExecutorBuilder {
            dialect,
            fs,
            layout: WorkDirLayout::default(),
            shell: DEFAULT_SHELL.to_string(),
            env: BTreeMap::new(),
            echo: false,
            valid_exit_codes: vec![0],
        }
    }

    pub fn dialect(&self) -> &dyn SchedulerDialect {
        self.dialect.as_ref()
    }

    pub fn layout(&self) -> &WorkDirLayout {
        &self.layout
    }

    /// The submit argv `launch` would run for `task`.
    pub fn submit_command(&self, task: &Task) -> Vec<String> {
        self.submitter.submit_command(task)
    }

    /// Assign a handler, write the wrapper files and submit.
    ///
    /// Blocks for as long as the scheduler's submit command runs. Errors
    /// writing the wrapper or spawning the submit command are returned; a
    /// rejected submission is reported as [`SubmitOutcome::Failed`].
    pub fn launch(&self, task: &Task) -> Result<SubmitOutcome> {
        {
            let mut state = task.lock_state();
            let layout = &self.layout;
            state
                .handler
                .get_or_insert_with(|| Handler::new(task.work_path(), layout));
        }

        let files = self.wrapper.build(self.fs.as_ref(), task)?;
        debug!(task = %task.name(), wrapper = ?files.wrapper, "launching task");

        self.submitter.submit(task)
    }

    pub fn check_started(&self, task: &Task) -> bool {
        self.poller.check_started(task)
    }

    pub fn check_completed(&self, task: &Task) -> bool {
        self.poller.check_completed(task)
    }

    /// Output file to report for a terminated task, if any.
    pub fn stdout_file(&self, task: &Task) -> Option<PathBuf> {
        self.poller.select_stdout(task)
    }

    pub fn is_valid_exit_code(&self, code: i32) -> bool {
        self.poller.is_valid_exit_code(code)
    }

    /// Ask the scheduler to cancel `job_id`.
    ///
    /// Blocks until the cancel command exits, not until the job is gone.
    /// Returns whether the command exited zero; any failure is only logged,
    /// since the job may well have finished already. The task's status is
    /// left for the poller to settle.
    pub fn kill(&self, job_id: &str) -> bool {
        let argv = self.dialect.kill_command(job_id);
        let command = display_command(&argv);

        info!(job_id, scheduler = self.dialect.name(), "cancelling job");

        match run_captured(&argv, Path::new("."), &BTreeMap::new()) {
            Ok((0, _)) => {
                debug!(job_id, "cancel command succeeded");
                true
            }
            Ok((code, output)) => {
                warn!(
                    job_id,
                    exit_code = code,
                    command = %command,
                    output = %output.trim(),
                    "cancel command failed"
                );
                false
            }
            Err(e) => {
                warn!(job_id, error = %e, "cannot run cancel command");
                false
            }
        }
    }
}
