// crates/test-utils/src/builders.rs

use std::collections::BTreeMap;
use std::path::Path;

use gridrun::config::{ConfigFile, ExecutorSection, InputConfig, RawConfigFile, TaskConfig};
use gridrun::errors::Result;
use gridrun::task::hash::compute_task_hash;
use gridrun::task::{ResourceSpec, Task, TaskSpec, WorkDirectory};
use gridrun::types::SchedulerKind;
use gridrun::wrapper::ScratchSetting;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                executor: ExecutorSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn scheduler(mut self, kind: SchedulerKind) -> Self {
        self.config.executor.scheduler = kind;
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.executor.poll_interval = interval.to_string();
        self
    }

    pub fn queue_size(mut self, size: usize) -> Self {
        self.config.executor.queue_size = size;
        self
    }

    pub fn scratch(mut self, setting: ScratchSetting) -> Self {
        self.config.executor.scratch = Some(setting);
        self
    }

    pub fn cluster_option(mut self, option: &str) -> Self {
        self.config.executor.cluster_options.push(option.to_string());
        self
    }

    pub fn queue(mut self, queue: &str) -> Self {
        self.config.executor.queue = Some(queue.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.executor.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(script: &str) -> Self {
        Self {
            task: TaskConfig {
                script: script.to_string(),
                stdin: None,
                inputs: vec![],
                outputs: vec![],
                env: BTreeMap::new(),
                time: None,
                memory: None,
                cpus: None,
                queue: None,
                cluster_options: vec![],
                scratch: None,
                stage_mode: None,
            },
        }
    }

    pub fn input(mut self, path: &str) -> Self {
        self.task.inputs.push(InputConfig::Path(path.to_string()));
        self
    }

    pub fn input_as(mut self, path: &str, stage_as: &str) -> Self {
        self.task.inputs.push(InputConfig::Staged {
            path: path.to_string(),
            stage_as: stage_as.to_string(),
        });
        self
    }

    pub fn output(mut self, pattern: &str) -> Self {
        self.task.outputs.push(pattern.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.task.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn time(mut self, spec: ResourceSpec) -> Self {
        self.task.time = Some(spec);
        self
    }

    pub fn memory(mut self, spec: ResourceSpec) -> Self {
        self.task.memory = Some(spec);
        self
    }

    pub fn cpus(mut self, cpus: u32) -> Self {
        self.task.cpus = Some(cpus);
        self
    }

    pub fn queue(mut self, queue: &str) -> Self {
        self.task.queue = Some(queue.to_string());
        self
    }

    pub fn cluster_option(mut self, option: &str) -> Self {
        self.task.cluster_options.push(option.to_string());
        self
    }

    pub fn scratch(mut self, setting: ScratchSetting) -> Self {
        self.task.scratch = Some(setting);
        self
    }

    pub fn stdin(mut self, content: &str) -> Self {
        self.task.stdin = Some(content.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// A task whose work directory is `<root>/<hash bucket>/<rest>`, created on
/// disk.
pub fn allocated_task(root: &Path, spec: TaskSpec) -> Task {
    let hash = compute_task_hash("test-session", &spec);
    let work_dir = WorkDirectory::allocate(root, &hash).expect("allocate work dir");
    Task::new(spec, work_dir)
}

/// A task with a fixed hash and a work directory that is never created.
pub fn task_at(root: &Path, hash: &str, spec: TaskSpec) -> Task {
    Task::new(spec, WorkDirectory::for_hash(root, hash))
}
