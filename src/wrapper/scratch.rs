// src/wrapper/scratch.rs

//! Scratch directory policy and the shell fragment that relocates a task.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{GridError, Result};
use crate::wrapper::shell_quote;

/// Shell variable the wrapper binds to the scratch directory.
pub const SCRATCH_VAR: &str = "grid_scratch";

/// Memory-backed filesystem used for `scratch = "ramdisk"`.
pub const RAMDISK_ROOT: &str = "/dev/shm";

static VARIABLE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$(?:[A-Za-z_][A-Za-z0-9_]*|\{[A-Za-z_][A-Za-z0-9_]*\})$")
        .expect("static variable regex")
});

/// `scratch` as written in the config: a flag or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScratchSetting {
    Flag(bool),
    Path(String),
}

/// Where (if anywhere) a task relocates before running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scratch {
    /// Run directly in the work directory.
    #[default]
    Disabled,
    /// Fresh directory under `$TMPDIR`, or the system default.
    Auto,
    /// Fresh directory under the value of a shell variable, e.g. `$SCRATCH`.
    Variable(String),
    /// Fresh directory under [`RAMDISK_ROOT`].
    RamDisk,
    /// Fresh directory under a fixed path.
    Directory(String),
}

impl Scratch {
    pub fn from_setting(setting: &ScratchSetting) -> Result<Self> {
        match setting {
            ScratchSetting::Flag(false) => Ok(Scratch::Disabled),
            ScratchSetting::Flag(true) => Ok(Scratch::Auto),
            ScratchSetting::Path(raw) => {
                let value = raw.trim();
                if value.is_empty() || value.eq_ignore_ascii_case("false") {
                    Ok(Scratch::Disabled)
                } else if value.eq_ignore_ascii_case("true") {
                    Ok(Scratch::Auto)
                } else if value.starts_with('$') {
                    if VARIABLE_REF.is_match(value) {
                        Ok(Scratch::Variable(value.to_string()))
                    } else {
                        Err(GridError::config(format!(
                            "invalid scratch variable reference '{}'",
                            value
                        )))
                    }
                } else if value.eq_ignore_ascii_case("ramdisk")
                    || value.eq_ignore_ascii_case("ram-disk")
                {
                    Ok(Scratch::RamDisk)
                } else {
                    Ok(Scratch::Directory(value.to_string()))
                }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Scratch::Disabled)
    }
}

/// Shell fragment that creates the scratch directory, binds it to
/// [`SCRATCH_VAR`] and changes into it. `None` when no relocation is needed.
///
/// Relies on the `grid_mktemp` helper emitted in the wrapper preamble.
pub fn resolve_scratch_directive(scratch: &Scratch) -> Option<String> {
    let parent = match scratch {
        Scratch::Disabled => return None,
        Scratch::Auto => "\"${TMPDIR:-}\"".to_string(),
        Scratch::Variable(var) => format!("\"{}\"", var),
        Scratch::RamDisk => RAMDISK_ROOT.to_string(),
        Scratch::Directory(path) => shell_quote(path),
    };

    Some(format!(
        "{var}=\"$(set +u; grid_mktemp {parent})\"\ncd \"${var}\"",
        var = SCRATCH_VAR,
        parent = parent
    ))
}
