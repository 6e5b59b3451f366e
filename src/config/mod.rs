// src/config/mod.rs

//! Configuration loading and validation for gridrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate values and turn each task section into a
//!   [`TaskSpec`](crate::task::TaskSpec) (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, ExecutorSection, ExecutorSettings, InputConfig, RawConfigFile, TaskConfig};
