// src/wrapper/builder.rs

//! Renders the `.job.run` wrapper and writes it with its companion files.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::task::{Task, WorkDirLayout};
use crate::wrapper::scratch::{resolve_scratch_directive, SCRATCH_VAR};
use crate::wrapper::shell_quote;
use crate::wrapper::staging::{
    interpreter_for, normalize_script, stage_inputs, unstage_outputs, WORKDIR_VAR,
};

/// Interpreter used for scripts without a `#!` line.
pub const DEFAULT_SHELL: &str = "/bin/bash -ue";

/// Paths of everything the builder wrote for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperFiles {
    pub script: PathBuf,
    pub env: PathBuf,
    pub stdin: Option<PathBuf>,
    pub output: PathBuf,
    pub wrapper: PathBuf,
    pub start_marker: PathBuf,
    pub exit_marker: PathBuf,
}

impl WrapperFiles {
    /// Paths for `work_dir` under `layout`. `with_stdin` decides whether the
    /// stdin file participates.
    pub fn for_work_dir(work_dir: &Path, layout: &WorkDirLayout, with_stdin: bool) -> Self {
        Self {
            script: work_dir.join(&layout.script),
            env: work_dir.join(&layout.env),
            stdin: with_stdin.then(|| work_dir.join(&layout.stdin)),
            output: work_dir.join(&layout.output),
            wrapper: work_dir.join(&layout.wrapper),
            start_marker: work_dir.join(&layout.start_marker),
            exit_marker: work_dir.join(&layout.exit_marker),
        }
    }
}

/// Job wrapper generator.
#[derive(Debug, Clone)]
pub struct JobWrapperBuilder {
    layout: WorkDirLayout,
    shell: String,
    base_env: BTreeMap<String, String>,
}

impl JobWrapperBuilder {
    pub fn new(layout: WorkDirLayout) -> Self {
        Self {
            layout,
            shell: DEFAULT_SHELL.to_string(),
            base_env: BTreeMap::new(),
        }
    }

    /// Interpreter for scripts without a `#!` line.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Environment exported for every task; task entries win on conflicts.
    pub fn with_base_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    pub fn layout(&self) -> &WorkDirLayout {
        &self.layout
    }

    /// Write script, environment, optional stdin and wrapper files into the
    /// task work directory.
    pub fn build(&self, fs: &dyn FileSystem, task: &Task) -> Result<WrapperFiles> {
        let spec = task.spec();
        let files = WrapperFiles::for_work_dir(task.work_path(), &self.layout, spec.stdin.is_some());

        let script = normalize_script(&spec.script, &self.shell);
        fs.write(&files.script, script.as_bytes())?;
        fs.make_executable(&files.script)?;

        fs.write(&files.env, self.render_env(task).as_bytes())?;

        if let (Some(path), Some(stdin)) = (&files.stdin, &spec.stdin) {
            fs.write(path, stdin.as_bytes())?;
        }

        let wrapper = self.render(task, &files);
        fs.write(&files.wrapper, wrapper.as_bytes())?;
        fs.make_executable(&files.wrapper)?;

        debug!(
            task = %task.name(),
            wrapper = ?files.wrapper,
            "wrote job wrapper"
        );

        Ok(files)
    }

    /// Environment file contents: one `export KEY='value'` line per entry.
    pub fn render_env(&self, task: &Task) -> String {
        let mut merged = self.base_env.clone();
        merged.extend(task.spec().env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut out = String::new();
        for (key, value) in &merged {
            let _ = writeln!(out, "export {}={}", key, shell_quote(value));
        }
        out
    }

    /// Render the wrapper script text.
    ///
    /// Order: exit trap, start marker, environment, scratch relocation, input
    /// staging, user script, output un-staging, explicit exit handler.
    pub fn render(&self, task: &Task, files: &WrapperFiles) -> String {
        let spec = task.spec();
        let q = |p: &Path| shell_quote(&p.to_string_lossy());
        let exit_tmp = files.exit_marker.with_extension("tmp");

        let mut out = String::new();
        out.push_str("#!/bin/bash\n");
        let _ = writeln!(out, "# gridrun task: {}", single_line(&spec.name));
        let _ = writeln!(out, "# hash: {}", task.hash());
        out.push_str("set -e\nset -u\n");
        let _ = writeln!(out, "{}={}", WORKDIR_VAR, q(task.work_path()));
        out.push('\n');

        out.push_str(
            "grid_mktemp() {\n    local base=${1:-/tmp}\n    mkdir -p \"$base\"\n    mktemp -d \"$base/grid.XXXXXXXXXX\"\n}\n\n",
        );

        // The exit marker goes through a temp file + rename so a concurrent
        // reader never sees a partial value, and the traps are cleared first
        // so it is written exactly once.
        out.push_str("grid_on_exit() {\n");
        out.push_str("    local grid_exit=${1:-$?}\n");
        out.push_str("    trap - EXIT HUP INT QUIT TERM\n");
        let _ = writeln!(
            out,
            "    printf '%s\\n' \"$grid_exit\" > {tmp} && mv -f {tmp} {exit}",
            tmp = q(&exit_tmp),
            exit = q(&files.exit_marker)
        );
        out.push_str("    exit \"$grid_exit\"\n}\n\n");

        out.push_str("trap 'grid_on_exit $?' EXIT\n");
        out.push_str("trap 'grid_on_exit 129' HUP\n");
        out.push_str("trap 'grid_on_exit 130' INT\n");
        out.push_str("trap 'grid_on_exit 131' QUIT\n");
        out.push_str("trap 'grid_on_exit 143' TERM\n\n");

        let _ = writeln!(out, "touch {}", q(&files.start_marker));
        let _ = writeln!(out, ". {}", q(&files.env));

        let scratch = resolve_scratch_directive(&spec.scratch);
        match &scratch {
            Some(directive) => {
                let _ = writeln!(out, "{directive}");
            }
            None => {
                let _ = writeln!(out, "cd \"${WORKDIR_VAR}\"");
            }
        }

        if let Some(staging) = stage_inputs(&spec.inputs, spec.stage_mode) {
            let _ = writeln!(out, "{staging}");
        }

        out.push('\n');
        out.push_str("grid_status=0\n");
        let interpreter = interpreter_for(&spec.script, &self.shell);
        let stdin = files
            .stdin
            .as_ref()
            .map(|p| format!(" < {}", q(p)))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{} {}{} > {} 2>&1 || grid_status=$?",
            interpreter,
            q(&files.script),
            stdin,
            q(&files.output)
        );

        if scratch.is_some() {
            if let Some(unstage) = unstage_outputs(&spec.outputs) {
                out.push('\n');
                let _ = writeln!(out, "{unstage}");
                let _ = writeln!(out, "cd \"${WORKDIR_VAR}\"");
                let _ = writeln!(out, "(rm -rf \"${SCRATCH_VAR}\" || true) &");
            }
        }

        out.push('\n');
        out.push_str("grid_on_exit \"$grid_status\"\n");
        out
    }
}

fn single_line(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}
