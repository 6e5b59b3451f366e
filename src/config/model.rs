// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::task::{ResourceSpec, TaskSpec};
use crate::types::{SchedulerKind, StageMode};
use crate::wrapper::builder::DEFAULT_SHELL;
use crate::wrapper::ScratchSetting;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [executor]
/// scheduler = "slurm"
/// poll_interval = "10s"
///
/// [task.align]
/// script = "bwa mem ref.fa reads.fq > out.sam"
/// inputs = ["data/ref.fa", { path = "data/sample1.fq", stage_as = "reads.fq" }]
/// outputs = ["*.sam"]
/// time = "2h"
/// memory = { request = "4 GB", limit = "8 GB" }
/// ```
///
/// Validation into a [`ConfigFile`] happens in `validate.rs`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub executor: ExecutorSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[executor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorSection {
    #[serde(default)]
    pub scheduler: SchedulerKind,

    /// Root of the content-addressed task directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// How often in-flight tasks are polled, e.g. `"5s"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Maximum number of tasks submitted but not yet terminated.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Copy each task's `.command.out` to stdout when it completes.
    #[serde(default)]
    pub echo: bool,

    #[serde(default = "default_valid_exit_codes")]
    pub valid_exit_codes: Vec<i32>,

    /// Default scratch policy; tasks may override it.
    #[serde(default)]
    pub scratch: Option<ScratchSetting>,

    #[serde(default)]
    pub stage_mode: StageMode,

    /// Interpreter for scripts without a `#!` line.
    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub queue: Option<String>,

    /// Raw submit flags added to every task.
    #[serde(default)]
    pub cluster_options: Vec<String>,

    /// Exported to every task; task-level `env` wins.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_work_dir() -> String {
    "work".to_string()
}

fn default_poll_interval() -> String {
    "5s".to_string()
}

fn default_queue_size() -> usize {
    100
}

fn default_valid_exit_codes() -> Vec<i32> {
    vec![0]
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            work_dir: default_work_dir(),
            poll_interval: default_poll_interval(),
            queue_size: default_queue_size(),
            echo: false,
            valid_exit_codes: default_valid_exit_codes(),
            scratch: None,
            stage_mode: StageMode::default(),
            shell: default_shell(),
            queue: None,
            cluster_options: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

/// One entry of a task's `inputs` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InputConfig {
    /// Staged under its own file name.
    Path(String),
    /// Staged under an explicit name.
    Staged { path: String, stage_as: String },
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Script body. A missing `#!` line means the executor's shell.
    pub script: String,

    /// Piped into the script through `.command.in`.
    #[serde(default)]
    pub stdin: Option<String>,

    #[serde(default)]
    pub inputs: Vec<InputConfig>,

    /// Glob patterns copied back from a scratch directory.
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub time: Option<ResourceSpec>,

    #[serde(default)]
    pub memory: Option<ResourceSpec>,

    #[serde(default)]
    pub cpus: Option<u32>,

    /// Overrides `[executor].queue`.
    #[serde(default)]
    pub queue: Option<String>,

    /// Appended to `[executor].cluster_options`.
    #[serde(default)]
    pub cluster_options: Vec<String>,

    /// Overrides `[executor].scratch`.
    #[serde(default)]
    pub scratch: Option<ScratchSetting>,

    /// Overrides `[executor].stage_mode`.
    #[serde(default)]
    pub stage_mode: Option<StageMode>,
}

/// Validated executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub scheduler: SchedulerKind,
    pub work_dir: PathBuf,
    pub poll_interval: Duration,
    pub queue_size: usize,
    pub echo: bool,
    pub valid_exit_codes: Vec<i32>,
    pub shell: String,
    pub env: BTreeMap<String, String>,
}

/// Validated configuration: executor settings plus one [`TaskSpec`] per
/// task, with executor-level defaults already folded in.
///
/// Construct through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub executor: ExecutorSettings,
    pub tasks: Vec<TaskSpec>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(executor: ExecutorSettings, tasks: Vec<TaskSpec>) -> Self {
        Self { executor, tasks }
    }

    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Make relative input paths and the work directory relative to `base`
    /// (normally the directory holding the config file).
    pub fn rebase(&mut self, base: &std::path::Path) {
        if self.executor.work_dir.is_relative() {
            self.executor.work_dir = base.join(&self.executor.work_dir);
        }
        for task in &mut self.tasks {
            for input in &mut task.inputs {
                if input.source.is_relative() {
                    input.source = base.join(&input.source);
                }
            }
        }
    }
}
