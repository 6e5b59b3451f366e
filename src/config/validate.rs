// src/config/validate.rs

use std::path::PathBuf;
use std::sync::LazyLock;

use globset::Glob;
use regex::Regex;

use crate::config::model::{
    ConfigFile, ExecutorSection, ExecutorSettings, InputConfig, RawConfigFile, TaskConfig,
};
use crate::errors::{GridError, Result};
use crate::task::resource::parse_duration;
use crate::task::{InputFile, MemorySize, ResourceRequest, TaskSpec, TimeSpan};
use crate::wrapper::Scratch;

static ENV_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static env key regex"));

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GridError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        let executor = validate_executor(&raw.executor)?;

        let tasks = raw
            .task
            .iter()
            .map(|(name, task)| build_task_spec(name, task, &raw.executor))
            .collect::<Result<Vec<_>>>()?;

        Ok(ConfigFile::new_unchecked(executor, tasks))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(GridError::config(
            "config must contain at least one [task.<name>] section",
        ));
    }
    Ok(())
}

fn validate_executor(section: &ExecutorSection) -> Result<ExecutorSettings> {
    if section.queue_size == 0 {
        return Err(GridError::config(
            "[executor].queue_size must be >= 1 (got 0)",
        ));
    }

    let poll_interval = parse_duration(&section.poll_interval).map_err(|e| {
        GridError::config(format!(
            "[executor].poll_interval '{}' is invalid: {}",
            section.poll_interval, e
        ))
    })?;
    if poll_interval.is_zero() {
        return Err(GridError::config("[executor].poll_interval must be > 0"));
    }

    if section.valid_exit_codes.is_empty() {
        return Err(GridError::config(
            "[executor].valid_exit_codes must not be empty",
        ));
    }

    if section.shell.trim().is_empty() {
        return Err(GridError::config("[executor].shell must not be empty"));
    }

    if section.work_dir.trim().is_empty() {
        return Err(GridError::config("[executor].work_dir must not be empty"));
    }

    validate_env("[executor]", &section.env)?;
    if let Some(setting) = &section.scratch {
        Scratch::from_setting(setting)?;
    }

    Ok(ExecutorSettings {
        scheduler: section.scheduler,
        work_dir: PathBuf::from(&section.work_dir),
        poll_interval,
        queue_size: section.queue_size,
        echo: section.echo,
        valid_exit_codes: section.valid_exit_codes.clone(),
        shell: section.shell.clone(),
        env: section.env.clone(),
    })
}

fn validate_env(owner: &str, env: &std::collections::BTreeMap<String, String>) -> Result<()> {
    for key in env.keys() {
        if !ENV_KEY.is_match(key) {
            return Err(GridError::config(format!(
                "{} env has invalid variable name '{}'",
                owner, key
            )));
        }
    }
    Ok(())
}

fn build_task_spec(name: &str, task: &TaskConfig, defaults: &ExecutorSection) -> Result<TaskSpec> {
    let owner = format!("[task.{name}]");

    if task.script.trim().is_empty() {
        return Err(GridError::config(format!("{owner} script must not be empty")));
    }

    for pattern in &task.outputs {
        Glob::new(pattern).map_err(|e| {
            GridError::config(format!("{owner} invalid output pattern '{pattern}': {e}"))
        })?;
    }

    validate_env(&owner, &task.env)?;

    let time = task
        .time
        .as_ref()
        .map(ResourceRequest::<TimeSpan>::parse)
        .transpose()
        .map_err(|e| prefixed(&owner, e))?;
    let memory = task
        .memory
        .as_ref()
        .map(ResourceRequest::<MemorySize>::parse)
        .transpose()
        .map_err(|e| prefixed(&owner, e))?;

    if task.cpus == Some(0) {
        return Err(GridError::config(format!("{owner} cpus must be >= 1")));
    }

    let scratch = match task.scratch.as_ref().or(defaults.scratch.as_ref()) {
        Some(setting) => Scratch::from_setting(setting).map_err(|e| prefixed(&owner, e))?,
        None => Scratch::Disabled,
    };

    let inputs = task
        .inputs
        .iter()
        .map(|input| match input {
            InputConfig::Path(path) => Ok(InputFile::new(path)),
            InputConfig::Staged { path, stage_as } => {
                if stage_as.trim().is_empty() || stage_as.starts_with('/') {
                    return Err(GridError::config(format!(
                        "{owner} input '{path}' must be staged under a relative name"
                    )));
                }
                Ok(InputFile::staged_as(path, stage_as.as_str()))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let mut cluster_options = defaults.cluster_options.clone();
    cluster_options.extend(task.cluster_options.iter().cloned());

    let mut spec = TaskSpec::new(name, task.script.clone());
    spec.stdin = task.stdin.clone();
    spec.inputs = inputs;
    spec.outputs = task.outputs.clone();
    spec.env = task.env.clone();
    spec.time = time;
    spec.memory = memory;
    spec.cpus = task.cpus;
    spec.queue = task.queue.clone().or_else(|| defaults.queue.clone());
    spec.cluster_options = cluster_options;
    spec.scratch = scratch;
    spec.stage_mode = task.stage_mode.unwrap_or(defaults.stage_mode);
    Ok(spec)
}

fn prefixed(owner: &str, err: GridError) -> GridError {
    match err {
        GridError::ConfigError(msg) => GridError::ConfigError(format!("{owner} {msg}")),
        other => other,
    }
}
