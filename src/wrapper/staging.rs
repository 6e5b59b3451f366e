// src/wrapper/staging.rs

//! Shell fragments for staging inputs, un-staging outputs and picking the
//! script interpreter.

use std::fmt::Write as _;
use std::path::Path;

use crate::task::InputFile;
use crate::types::StageMode;
use crate::wrapper::shell_quote;

/// Shell variable bound to the task work directory inside the wrapper.
pub const WORKDIR_VAR: &str = "grid_workdir";

/// Emit commands placing every input into the current directory.
///
/// Returns `None` when there is nothing to stage.
pub fn stage_inputs(inputs: &[InputFile], mode: StageMode) -> Option<String> {
    if inputs.is_empty() {
        return None;
    }

    let mut out = String::new();
    for input in inputs {
        let target = shell_quote(&input.stage_as);
        let source = shell_quote(&input.source.to_string_lossy());

        let _ = writeln!(out, "rm -f {target}");
        if let Some(parent) = Path::new(&input.stage_as).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = writeln!(out, "mkdir -p {}", shell_quote(&parent.to_string_lossy()));
            }
        }
        match mode {
            StageMode::Symlink => {
                let _ = writeln!(out, "ln -s {source} {target}");
            }
            StageMode::Copy => {
                let _ = writeln!(out, "cp -fRL {source} {target}");
            }
        }
    }

    Some(out.trim_end().to_string())
}

/// Emit commands copying every file matching `outputs` back into the work
/// directory. Missing outputs are skipped so the user's exit status survives.
pub fn unstage_outputs(outputs: &[String]) -> Option<String> {
    if outputs.is_empty() {
        return None;
    }

    let mut out = String::new();
    for pattern in outputs {
        let _ = writeln!(out, "for grid_f in {}; do", glob_quote(pattern));
        let _ = writeln!(out, "    [ -e \"$grid_f\" ] || continue");
        let _ = writeln!(
            out,
            "    mkdir -p \"${WORKDIR_VAR}/$(dirname \"$grid_f\")\" || true"
        );
        let _ = writeln!(
            out,
            "    cp -fRL \"$grid_f\" \"${WORKDIR_VAR}/$grid_f\" || true"
        );
        let _ = writeln!(out, "done");
    }

    Some(out.trim_end().to_string())
}

/// Interpreter declared by the script's `#!` line, or `default_shell`.
///
/// Leading blank lines are skipped, matching what [`normalize_script`]
/// writes to disk.
pub fn interpreter_for(script: &str, default_shell: &str) -> String {
    match script_body(script).lines().next() {
        Some(first) if first.starts_with("#!") => {
            let declared = first[2..].trim();
            if declared.is_empty() {
                default_shell.to_string()
            } else {
                declared.to_string()
            }
        }
        _ => default_shell.to_string(),
    }
}

/// Script as written to disk: guaranteed to start with a `#!` line and to end
/// with a newline.
pub fn normalize_script(script: &str, default_shell: &str) -> String {
    let body = script_body(script);
    let mut normalized = if body.starts_with("#!") {
        body.to_string()
    } else {
        format!("#!{}\n{}", default_shell, body)
    };
    if !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

fn script_body(script: &str) -> &str {
    script.trim_start_matches(['\n', '\r'])
}

/// Escape a glob pattern for the shell while leaving `* ? [ ]` active.
fn glob_quote(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '*' | '?' | '[' | ']' | '/' | '.' | '_' | '-' | '+' | ',') {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}
