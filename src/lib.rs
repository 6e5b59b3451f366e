// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod scheduler;
pub mod task;
pub mod types;
pub mod wrapper;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{new_session_id, prepare_tasks, Runtime};
use crate::errors::GridError;
use crate::exec::GridExecutor;
use crate::fs::RealFileSystem;
use crate::scheduler::{dialect_for, display_command};
use crate::task::hash::compute_task_hash;
use crate::task::{Task, WorkDirectory};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (+ CLI overrides)
/// - work directory allocation
/// - the grid executor for the configured scheduler
/// - the polling runtime and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;

    if let Some(kind) = args.scheduler {
        cfg.executor.scheduler = kind;
    }
    if let Some(ref dir) = args.work_dir {
        cfg.executor.work_dir = PathBuf::from(dir);
    }

    let executor = Arc::new(build_executor(&cfg));

    if args.dry_run {
        print_dry_run(&cfg, &executor);
        return Ok(());
    }

    let session = new_session_id();
    let tasks = prepare_tasks(&cfg.tasks, &cfg.executor.work_dir, &session)?;
    info!(
        scheduler = %cfg.executor.scheduler,
        work_dir = ?cfg.executor.work_dir,
        tasks = tasks.len(),
        "starting run"
    );

    let runtime = Runtime::new(
        executor,
        tasks,
        cfg.executor.poll_interval,
        cfg.executor.queue_size,
    );
    let summary = runtime.run().await?;

    for label in &summary.provenance {
        info!(node = %label, "provenance");
    }
    for report in &summary.tasks {
        info!(
            task = %report.name,
            submitted = report.submitted,
            exit_code = ?report.exit_code,
            success = report.success,
            stdout = ?report.stdout,
            "task finished"
        );
    }

    let failed = summary.failed_count();
    if failed > 0 {
        return Err(GridError::TasksFailed(failed).into());
    }
    Ok(())
}

/// Executor configured from the `[executor]` section.
pub fn build_executor(cfg: &ConfigFile) -> GridExecutor {
    let dialect = dialect_for(cfg.executor.scheduler);
    GridExecutor::builder(Arc::from(dialect), Arc::new(RealFileSystem))
        .shell(cfg.executor.shell.clone())
        .env(cfg.executor.env.clone())
        .echo(cfg.executor.echo)
        .valid_exit_codes(cfg.executor.valid_exit_codes.clone())
        .build()
}

/// Print tasks, resources and the submit command each would use.
fn print_dry_run(cfg: &ConfigFile, executor: &GridExecutor) {
    println!("gridrun dry-run");
    println!("  executor.scheduler = {}", cfg.executor.scheduler);
    println!("  executor.work_dir = {}", cfg.executor.work_dir.display());
    println!("  executor.poll_interval = {:?}", cfg.executor.poll_interval);
    println!("  executor.queue_size = {}", cfg.executor.queue_size);
    println!();

    let session = new_session_id();
    println!("tasks ({}):", cfg.tasks.len());
    for spec in &cfg.tasks {
        println!("  - {}", spec.name);
        if let Some(ref time) = spec.time {
            println!("      time: {}", time.effective_limit());
        }
        if let Some(ref memory) = spec.memory {
            println!("      memory: {}", memory.effective_limit());
        }
        if let Some(cpus) = spec.cpus {
            println!("      cpus: {cpus}");
        }
        if spec.scratch.is_enabled() {
            println!("      scratch: {:?}", spec.scratch);
        }
        for input in &spec.inputs {
            println!("      input: {} -> {}", input.source.display(), input.stage_as);
        }
        if !spec.outputs.is_empty() {
            println!("      outputs: {:?}", spec.outputs);
        }

        let hash = compute_task_hash(&session, spec);
        let task = Task::new(
            spec.clone(),
            WorkDirectory::for_hash(&cfg.executor.work_dir, &hash),
        );
        println!("      submit: {}", display_command(&executor.submit_command(&task)));
    }

    debug!("dry-run complete (no execution)");
}
