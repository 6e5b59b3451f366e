// src/wrapper/mod.rs

//! Job wrapper generation.
//!
//! The wrapper is the self-contained shell script actually submitted to the
//! scheduler. It reports progress to the engine only through marker files in
//! the task work directory.
//!
//! - [`builder`] renders and writes the wrapper plus its companion files.
//! - [`scratch`] resolves the scratch-directory policy into shell.
//! - [`staging`] emits input staging / output un-staging fragments.

pub mod builder;
pub mod scratch;
pub mod staging;

pub use builder::{JobWrapperBuilder, WrapperFiles};
pub use scratch::{resolve_scratch_directive, Scratch, ScratchSetting};

/// Quote `s` as a single shell word.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ',' | ':' | '='))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}
