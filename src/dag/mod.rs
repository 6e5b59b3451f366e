// src/dag/mod.rs

//! Provenance graph of executed tasks.
//!
//! - [`concrete`] records each completed task under its content hash and
//!   links it to the tasks whose work directories its inputs came from.

pub mod concrete;

pub use concrete::{extract_predecessor, ConcreteDag, DagNode};
