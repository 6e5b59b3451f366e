// tests/poller_lifecycle.rs

mod common;
use crate::common::{at_secs, init_tracing, launched_task, marker, mock_executor};

use std::sync::Arc;
use std::thread;

use gridrun::exec::UNKNOWN_EXIT_STATUS;
use gridrun::fs::mock::MockFileSystem;
use gridrun::task::TaskStatus;

#[test]
fn not_started_until_start_marker_appears() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::Submitted);

    assert!(!exec.check_started(&task));
    assert!(!exec.check_started(&task));
    assert_eq!(task.status(), TaskStatus::Submitted);
    assert!(task.started_at().is_none());

    fs.add_file_at(marker(&task, ".job.started"), "", at_secs(1_000));

    assert!(exec.check_started(&task));
    assert_eq!(task.status(), TaskStatus::Started);
    assert_eq!(task.started_at(), Some(at_secs(1_000)));
}

#[test]
fn check_started_is_idempotent() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::Submitted);

    fs.add_file_at(marker(&task, ".job.started"), "", at_secs(1_000));
    assert!(exec.check_started(&task));

    // A later marker with a different mtime, or no marker at all, changes nothing.
    fs.add_file_at(marker(&task, ".job.started"), "", at_secs(2_000));
    assert!(exec.check_started(&task));
    fs.remove_file(marker(&task, ".job.started"));
    assert!(exec.check_started(&task));

    assert_eq!(task.started_at(), Some(at_secs(1_000)));
    assert_eq!(task.status(), TaskStatus::Started);
}

#[test]
fn new_task_is_never_started_by_a_stale_marker() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::New);

    fs.add_file(marker(&task, ".job.started"), "");

    assert!(!exec.check_started(&task));
    assert_eq!(task.status(), TaskStatus::New);
}

#[test]
fn exit_marker_before_start_is_not_completion() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::Submitted);

    fs.add_file(marker(&task, ".exitcode"), "0\n");

    for _ in 0..3 {
        assert!(!exec.check_completed(&task));
    }
    assert_eq!(task.status(), TaskStatus::Submitted);
    assert_eq!(task.exit_code(), None);
    assert_eq!(fs.read_count(marker(&task, ".exitcode")), 0);

    fs.add_file(marker(&task, ".job.started"), "");
    assert!(exec.check_started(&task));
    assert!(exec.check_completed(&task));
    assert_eq!(task.status(), TaskStatus::Terminated);
    assert_eq!(task.exit_code(), Some(0));
}

#[test]
fn started_task_waits_for_exit_marker() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::Started);

    assert!(!exec.check_completed(&task));
    assert_eq!(task.status(), TaskStatus::Started);
    assert!(task.completed_at().is_none());
}

#[test]
fn completion_records_exit_code_time_and_stdout() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::Started);

    fs.add_file(marker(&task, ".command.out"), "hello\n");
    fs.add_file_at(marker(&task, ".exitcode"), "3\n", at_secs(5_000));

    assert!(exec.check_completed(&task));
    assert_eq!(task.exit_code(), Some(3));
    assert_eq!(task.completed_at(), Some(at_secs(5_000)));
    assert_eq!(
        task.lock_state().stdout.as_deref(),
        Some(marker(&task, ".command.out").as_path())
    );
}

#[test]
fn exit_marker_is_read_once() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::Started);

    fs.add_file_at(marker(&task, ".exitcode"), "1", at_secs(5_000));
    for _ in 0..5 {
        assert!(exec.check_completed(&task));
    }

    // Rewriting the marker afterwards does not change the recorded result.
    fs.add_file_at(marker(&task, ".exitcode"), "0", at_secs(9_000));
    assert!(exec.check_completed(&task));

    assert_eq!(fs.read_count(marker(&task, ".exitcode")), 1);
    assert_eq!(task.exit_code(), Some(1));
    assert_eq!(task.completed_at(), Some(at_secs(5_000)));
}

#[test]
fn unparsable_exit_marker_yields_sentinel() {
    init_tracing();
    for content in ["", "not-a-number\n", "1.5"] {
        let fs = MockFileSystem::new();
        let exec = mock_executor(&fs, false, vec![0]);
        let task = launched_task(TaskStatus::Started);

        fs.add_file(marker(&task, ".exitcode"), content);

        assert!(exec.check_completed(&task), "content {content:?}");
        assert_eq!(task.exit_code(), Some(UNKNOWN_EXIT_STATUS));
        assert_eq!(task.status(), TaskStatus::Terminated);
        assert!(!exec.is_valid_exit_code(UNKNOWN_EXIT_STATUS));
    }
}

#[test]
fn padded_exit_code_parses() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = launched_task(TaskStatus::Started);

    fs.add_file(marker(&task, ".exitcode"), "  143 \n\n");
    assert!(exec.check_completed(&task));
    assert_eq!(task.exit_code(), Some(143));
}

#[test]
fn echo_happens_once() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, true, vec![0]);
    let task = launched_task(TaskStatus::Started);

    fs.add_file(marker(&task, ".command.out"), "echoed output\n");
    fs.add_file(marker(&task, ".exitcode"), "0");

    for _ in 0..4 {
        assert!(exec.check_completed(&task));
    }
    assert_eq!(fs.read_count(marker(&task, ".command.out")), 1);
}

#[test]
fn echo_of_missing_output_does_not_block_completion() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, true, vec![0]);
    let task = launched_task(TaskStatus::Started);

    fs.add_file(marker(&task, ".exitcode"), "0");

    assert!(exec.check_completed(&task));
    assert_eq!(task.status(), TaskStatus::Terminated);
    assert_eq!(task.exit_code(), Some(0));
}

#[test]
fn concurrent_polls_transition_exactly_once() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = Arc::new(mock_executor(&fs, true, vec![0]));
    let task = Arc::new(launched_task(TaskStatus::Submitted));

    fs.add_file(marker(&task, ".job.started"), "");
    fs.add_file(marker(&task, ".command.out"), "x");
    fs.add_file(marker(&task, ".exitcode"), "0");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let exec = exec.clone();
            let task = task.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    if exec.check_started(&task) {
                        exec.check_completed(&task);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("poll thread panicked");
    }

    assert_eq!(task.status(), TaskStatus::Terminated);
    assert_eq!(fs.read_count(marker(&task, ".exitcode")), 1);
    assert_eq!(fs.read_count(marker(&task, ".command.out")), 1);
}

fn terminated_with(fs: &MockFileSystem, exit: &str, primary: &str, secondary: Option<&str>) -> gridrun::task::Task {
    let task = launched_task(TaskStatus::Started);
    fs.add_file(marker(&task, ".command.out"), primary);
    if let Some(content) = secondary {
        fs.add_file(marker(&task, ".job.out"), content);
    }
    fs.add_file(marker(&task, ".exitcode"), exit);
    task
}

#[test]
fn stdout_selection_for_valid_exit_code() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0, 3]);

    let task = terminated_with(&fs, "3", "result\n", Some("scheduler noise"));
    assert!(exec.check_completed(&task));
    assert_eq!(exec.stdout_file(&task), Some(marker(&task, ".command.out")));

    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = terminated_with(&fs, "0", "", Some("scheduler noise"));
    assert!(exec.check_completed(&task));
    assert_eq!(exec.stdout_file(&task), None);
}

#[test]
fn stdout_selection_for_failed_exit_code() {
    init_tracing();

    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = terminated_with(&fs, "1", "traceback\n", Some("scheduler noise"));
    assert!(exec.check_completed(&task));
    assert_eq!(exec.stdout_file(&task), Some(marker(&task, ".command.out")));

    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = terminated_with(&fs, "1", "", Some("slurmstepd: error: oom-kill\n"));
    assert!(exec.check_completed(&task));
    assert_eq!(exec.stdout_file(&task), Some(marker(&task, ".job.out")));

    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = terminated_with(&fs, "1", "", Some(""));
    assert!(exec.check_completed(&task));
    assert_eq!(exec.stdout_file(&task), None);

    let fs = MockFileSystem::new();
    let exec = mock_executor(&fs, false, vec![0]);
    let task = terminated_with(&fs, "garbage", "", None);
    assert!(exec.check_completed(&task));
    assert_eq!(exec.stdout_file(&task), None);
}
