// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::dag::ConcreteDag;
use crate::errors::{GridError, Result};
use crate::exec::{GridExecutor, SubmitOutcome};
use crate::task::Task;

use super::{RunSummary, TaskReport};

/// Drives a batch of tasks through a [`GridExecutor`].
///
/// Keeps at most `queue_size` tasks in flight. Submission runs on the
/// blocking pool since it waits for the scheduler's submit command; marker
/// polling happens on every tick of `poll_interval`.
pub struct Runtime {
    executor: Arc<GridExecutor>,
    pending: VecDeque<Arc<Task>>,
    in_flight: Vec<Arc<Task>>,
    poll_interval: Duration,
    queue_size: usize,
    dag: Arc<ConcreteDag>,
    summary: RunSummary,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("pending", &self.pending.len())
            .field("in_flight", &self.in_flight.len())
            .field("poll_interval", &self.poll_interval)
            .field("queue_size", &self.queue_size)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        executor: Arc<GridExecutor>,
        tasks: Vec<Arc<Task>>,
        poll_interval: Duration,
        queue_size: usize,
    ) -> Self {
        Self {
            executor,
            pending: tasks.into(),
            in_flight: Vec::new(),
            poll_interval,
            queue_size: queue_size.max(1),
            dag: Arc::new(ConcreteDag::new()),
            summary: RunSummary::default(),
        }
    }

    /// Provenance graph filled in as tasks complete.
    pub fn dag(&self) -> Arc<ConcreteDag> {
        self.dag.clone()
    }

    /// Run until every task has terminated or failed to submit, or until
    /// Ctrl-C.
    pub async fn run(self) -> Result<RunSummary> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(ctrl_c).await
    }

    /// Like [`Runtime::run`], with `shutdown` standing in for Ctrl-C.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        info!(
            tasks = self.pending.len(),
            queue_size = self.queue_size,
            poll_interval = ?self.poll_interval,
            "gridrun runtime started"
        );

        tokio::pin!(shutdown);
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    warn!(in_flight = self.in_flight.len(), "shutdown requested; cancelling jobs");
                    self.cancel_in_flight().await;
                    self.record_unfinished();
                    self.summary.cancelled = true;
                    break;
                }
            }

            self.launch_ready().await?;
            self.poll_in_flight().await?;

            if self.pending.is_empty() && self.in_flight.is_empty() {
                break;
            }
        }

        self.summary.provenance = self.dag.topological_labels();
        info!(
            completed = self.summary.tasks.len(),
            failed = self.summary.failed_count(),
            "runtime exiting"
        );
        Ok(self.summary)
    }

    async fn launch_ready(&mut self) -> Result<()> {
        while self.in_flight.len() < self.queue_size {
            let Some(task) = self.pending.pop_front() else {
                break;
            };

            let executor = self.executor.clone();
            let launched = task.clone();
            let outcome = tokio::task::spawn_blocking(move || executor.launch(&launched))
                .await
                .map_err(|e| GridError::Other(anyhow::anyhow!("launch task panicked: {e}")))?;

            match outcome {
                Ok(SubmitOutcome::Submitted { .. }) => self.in_flight.push(task),
                Ok(SubmitOutcome::Failed {
                    command,
                    exit_code,
                    output,
                }) => {
                    let err = GridError::Submit {
                        command,
                        exit_code,
                        output,
                    };
                    error!(task = %task.name(), error = %err, "task not submitted");
                    self.summary.tasks.push(TaskReport::not_submitted(&task, Some(exit_code)));
                }
                Err(e) => {
                    error!(task = %task.name(), error = %e, "task not submitted");
                    self.summary.tasks.push(TaskReport::not_submitted(&task, None));
                }
            }
        }
        Ok(())
    }

    async fn poll_in_flight(&mut self) -> Result<()> {
        if self.in_flight.is_empty() {
            return Ok(());
        }

        let executor = self.executor.clone();
        let tasks = self.in_flight.clone();
        let finished: Vec<(usize, Option<PathBuf>)> = tokio::task::spawn_blocking(move || {
            tasks
                .iter()
                .enumerate()
                .filter(|(_, task)| executor.check_started(task) && executor.check_completed(task))
                .map(|(i, task)| (i, executor.stdout_file(task)))
                .collect()
        })
        .await
        .map_err(|e| GridError::Other(anyhow::anyhow!("poll task panicked: {e}")))?;

        for (i, stdout) in finished.iter().rev() {
            let task = self.in_flight.swap_remove(*i);
            self.dag.add_task(&task);

            let exit_code = task.exit_code();
            let valid = exit_code.is_some_and(|c| self.executor.is_valid_exit_code(c));
            match stdout {
                Some(path) => debug!(task = %task.name(), stdout = ?path, "task output"),
                None => debug!(task = %task.name(), "task produced no output"),
            }
            if !valid {
                warn!(
                    task = %task.name(),
                    exit_code = ?exit_code,
                    work_dir = ?task.work_path(),
                    "task failed"
                );
            }

            self.summary.tasks.push(TaskReport {
                name: task.name().to_string(),
                hash: task.hash().to_string(),
                submitted: true,
                exit_code,
                success: valid,
                stdout: stdout.clone(),
            });
        }

        Ok(())
    }

    /// Run the cancel command for every in-flight job and wait for all of
    /// them to exit.
    async fn cancel_in_flight(&self) {
        let mut kills = JoinSet::new();
        for task in &self.in_flight {
            match task.job_id() {
                Some(job_id) => {
                    let executor = self.executor.clone();
                    kills.spawn_blocking(move || executor.kill(&job_id));
                }
                None => warn!(task = %task.name(), "no job id recorded; cannot cancel"),
            }
        }

        let mut failed = 0;
        while let Some(joined) = kills.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => failed += 1,
                Err(e) => {
                    error!(error = %e, "cancel task panicked");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            warn!(failed, "some jobs could not be cancelled");
        }
    }

    /// Report every task that never reached a terminal state as failed.
    fn record_unfinished(&mut self) {
        for task in self.in_flight.drain(..) {
            self.summary.tasks.push(TaskReport {
                name: task.name().to_string(),
                hash: task.hash().to_string(),
                submitted: true,
                exit_code: task.exit_code(),
                success: false,
                stdout: None,
            });
        }
        for task in self.pending.drain(..) {
            self.summary.tasks.push(TaskReport::not_submitted(&task, None));
        }
    }
}
