// src/exec/mod.rs

//! Grid execution layer.
//!
//! Turns a [`Task`](crate::task::Task) into a scheduler job and follows it to
//! completion through marker files in its work directory.
//!
//! - [`handler`] holds the per-launch job id, marker paths and cached exit status.
//! - [`submitter`] runs the scheduler's submit command and parses the job id.
//! - [`poller`] advances task status from the start/exit markers and picks
//!   the output file to report.
//! - [`executor`] wires these together behind [`GridExecutor`], the surface
//!   the runtime uses.

pub mod executor;
pub mod handler;
pub mod poller;
pub mod submitter;

pub use executor::{GridExecutor, GridExecutorBuilder};
pub use handler::Handler;
pub use poller::{TaskPoller, UNKNOWN_EXIT_STATUS};
pub use submitter::{JobSubmitter, SubmitOutcome};
