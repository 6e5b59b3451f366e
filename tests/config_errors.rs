// tests/config_errors.rs

use std::path::PathBuf;
use std::time::Duration;

use gridrun::config::{load_and_validate, parse_str};
use gridrun::errors::GridError;
use gridrun::task::{InputFile, ResourceSpec};
use gridrun::types::{SchedulerKind, StageMode};
use gridrun::wrapper::{Scratch, ScratchSetting};
use gridrun_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};

fn config_error(result: gridrun::errors::Result<gridrun::config::ConfigFile>) -> String {
    match result {
        Err(GridError::ConfigError(msg)) => msg,
        Err(other) => panic!("expected config error, got {other:?}"),
        Ok(cfg) => panic!("expected config error, got {cfg:?}"),
    }
}

#[test]
fn parses_full_toml() {
    let cfg = parse_str(
        r#"
[executor]
scheduler = "slurm"
poll_interval = "250ms"
queue_size = 4
queue = "short"
cluster_options = ["--account=lab"]
env = { LANG = "C" }
scratch = "$TMPDIR"

[task.align]
script = "bwa mem ref.fa reads.fq > out.sam"
inputs = ["data/ref.fa", { path = "data/sample1.fq", stage_as = "reads.fq" }]
outputs = ["*.sam"]
time = "2h"
memory = { request = "4 GB", limit = "8 GB" }
cpus = 8
cluster_options = ["--exclusive"]

[task.index]
script = "samtools index out.bam"
queue = "long"
scratch = false
stage_mode = "copy"
"#,
    )
    .expect("valid config");

    assert_eq!(cfg.executor.scheduler, SchedulerKind::Slurm);
    assert_eq!(cfg.executor.poll_interval, Duration::from_millis(250));
    assert_eq!(cfg.executor.queue_size, 4);
    assert_eq!(cfg.executor.valid_exit_codes, vec![0]);
    assert_eq!(cfg.executor.work_dir, PathBuf::from("work"));
    assert_eq!(cfg.tasks.len(), 2);

    let align = cfg.task("align").expect("align task");
    assert_eq!(
        align.inputs,
        vec![
            InputFile::staged_as("data/ref.fa", "ref.fa"),
            InputFile::staged_as("data/sample1.fq", "reads.fq"),
        ]
    );
    assert_eq!(align.cpus, Some(8));
    assert_eq!(align.queue.as_deref(), Some("short"));
    assert_eq!(align.cluster_options, vec!["--account=lab", "--exclusive"]);
    assert_eq!(align.scratch, Scratch::Variable("$TMPDIR".to_string()));
    assert_eq!(align.stage_mode, StageMode::Symlink);
    let memory = align.memory.as_ref().expect("memory");
    assert_eq!(memory.request().map(|m| m.as_mega()), Some(4096));
    assert_eq!(memory.limit().map(|m| m.as_mega()), Some(8192));
    assert_eq!(
        align.time.as_ref().map(|t| t.effective_limit().as_duration()),
        Some(Duration::from_secs(7200))
    );

    let index = cfg.task("index").expect("index task");
    assert_eq!(index.queue.as_deref(), Some("long"));
    assert_eq!(index.scratch, Scratch::Disabled);
    assert_eq!(index.stage_mode, StageMode::Copy);
    assert_eq!(index.cluster_options, vec!["--account=lab"]);
}

#[test]
fn toml_syntax_errors_surface_as_toml_errors() {
    let err = parse_str("[task.a\nscript = 1").unwrap_err();
    assert!(matches!(err, GridError::TomlError(_)), "{err:?}");
}

#[test]
fn unknown_scheduler_is_rejected() {
    let err = parse_str("[executor]\nscheduler = \"condor\"\n[task.a]\nscript = \"true\"\n")
        .unwrap_err();
    assert!(matches!(err, GridError::TomlError(_)), "{err:?}");
}

#[test]
fn config_without_tasks_is_rejected() {
    let msg = config_error(ConfigFileBuilder::new().try_build());
    assert!(msg.contains("at least one"), "{msg}");
}

#[test]
fn executor_values_are_checked() {
    let task = || TaskConfigBuilder::new("true").build();

    let msg = config_error(ConfigFileBuilder::new().with_task("a", task()).queue_size(0).try_build());
    assert!(msg.contains("queue_size"), "{msg}");

    let msg = config_error(
        ConfigFileBuilder::new()
            .with_task("a", task())
            .poll_interval("soon")
            .try_build(),
    );
    assert!(msg.contains("poll_interval"), "{msg}");

    let msg = config_error(
        ConfigFileBuilder::new()
            .with_task("a", task())
            .poll_interval("0s")
            .try_build(),
    );
    assert!(msg.contains("must be > 0"), "{msg}");

    let msg = config_error(
        ConfigFileBuilder::new()
            .with_task("a", task())
            .env("1BAD", "x")
            .try_build(),
    );
    assert!(msg.contains("1BAD"), "{msg}");

    let msg = config_error(
        ConfigFileBuilder::new()
            .with_task("a", task())
            .scratch(ScratchSetting::Path("$not a var".to_string()))
            .try_build(),
    );
    assert!(msg.contains("scratch"), "{msg}");

    let mut raw = ConfigFileBuilder::new().with_task("a", task()).raw();
    raw.executor.valid_exit_codes.clear();
    let msg = config_error(gridrun::config::ConfigFile::try_from(raw));
    assert!(msg.contains("valid_exit_codes"), "{msg}");
}

#[test]
fn task_errors_name_the_task() {
    let cases = [
        (TaskConfigBuilder::new("   ").build(), "script must not be empty"),
        (TaskConfigBuilder::new("true").output("[unclosed").build(), "output pattern"),
        (TaskConfigBuilder::new("true").env("A-B", "x").build(), "A-B"),
        (
            TaskConfigBuilder::new("true")
                .time(ResourceSpec::map(None, None))
                .build(),
            "must define `request`, `limit` or both",
        ),
        (
            TaskConfigBuilder::new("true")
                .memory(ResourceSpec::scalar("lots"))
                .build(),
            "invalid memory value 'lots'",
        ),
        (TaskConfigBuilder::new("true").cpus(0).build(), "cpus"),
        (
            TaskConfigBuilder::new("true").input_as("data/a.txt", "/abs/a.txt").build(),
            "relative name",
        ),
    ];

    for (task, expected) in cases {
        let msg = config_error(ConfigFileBuilder::new().with_task("broken", task).try_build());
        assert!(msg.starts_with("[task.broken]"), "{msg}");
        assert!(msg.contains(expected), "expected '{expected}' in '{msg}'");
    }
}

#[test]
fn task_settings_override_executor_defaults() {
    let cfg = ConfigFileBuilder::new()
        .queue("default-q")
        .cluster_option("--qos=normal")
        .scratch(ScratchSetting::Flag(true))
        .with_task("inherits", TaskConfigBuilder::new("true").build())
        .with_task(
            "overrides",
            TaskConfigBuilder::new("true")
                .queue("gpu")
                .cluster_option("--gres=gpu:1")
                .scratch(ScratchSetting::Path("ramdisk".to_string()))
                .build(),
        )
        .build();

    let inherits = cfg.task("inherits").expect("task");
    assert_eq!(inherits.queue.as_deref(), Some("default-q"));
    assert_eq!(inherits.cluster_options, vec!["--qos=normal"]);
    assert_eq!(inherits.scratch, Scratch::Auto);

    let overrides = cfg.task("overrides").expect("task");
    assert_eq!(overrides.queue.as_deref(), Some("gpu"));
    assert_eq!(overrides.cluster_options, vec!["--qos=normal", "--gres=gpu:1"]);
    assert_eq!(overrides.scratch, Scratch::RamDisk);
}

#[test]
fn load_and_validate_resolves_paths_against_config_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Gridrun.toml");
    std::fs::write(
        &path,
        r#"
[executor]
work_dir = "runs"

[task.a]
script = "cat in.txt"
inputs = ["data/in.txt", "/abs/ref.fa"]
"#,
    )
    .expect("write config");

    let cfg = load_and_validate(&path).expect("valid config");
    assert_eq!(cfg.executor.work_dir, dir.path().join("runs"));

    let inputs = &cfg.task("a").expect("task").inputs;
    assert_eq!(inputs[0].source, dir.path().join("data/in.txt"));
    assert_eq!(inputs[0].stage_as, "in.txt");
    assert_eq!(inputs[1].source, PathBuf::from("/abs/ref.fa"));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_and_validate(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, GridError::IoError(_)), "{err:?}");
}
