#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use gridrun::exec::{GridExecutor, Handler};
use gridrun::fs::mock::MockFileSystem;
use gridrun::scheduler::LocalDialect;
use gridrun::task::{Task, TaskSpec, TaskStatus, WorkDirLayout};
use gridrun_test_utils::builders::task_at;

pub use gridrun_test_utils::init_tracing;

pub const HASH: &str = "ab0123456789abcdef0123456789abcd";

/// A task in `/work` with a handler assigned and the given status, as if
/// it had been launched.
pub fn launched_task(status: TaskStatus) -> Task {
    let task = task_at(Path::new("/work"), HASH, TaskSpec::new("align", "echo hi"));
    {
        let mut state = task.lock_state();
        state.handler = Some(Handler::new(task.work_path(), &WorkDirLayout::default()));
        state.status = status;
    }
    task
}

pub fn marker(task: &Task, name: &str) -> PathBuf {
    task.work_path().join(name)
}

pub fn mock_executor(fs: &MockFileSystem, echo: bool, valid: Vec<i32>) -> GridExecutor {
    GridExecutor::builder(Arc::new(LocalDialect), Arc::new(fs.clone()))
        .echo(echo)
        .valid_exit_codes(valid)
        .build()
}

pub fn at_secs(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}
