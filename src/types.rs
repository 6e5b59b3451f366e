// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Batch system the executor submits jobs to.
///
/// - `Local`: detached background shell on the current host.
/// - `Slurm`: `sbatch` / `scancel`.
/// - `Sge`: Sun/Univa Grid Engine `qsub` / `qdel`.
/// - `Pbs`: PBS/Torque `qsub` / `qdel`.
/// - `Lsf`: IBM LSF `bsub` / `bkill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    Local,
    Slurm,
    Sge,
    Pbs,
    Lsf,
}

impl Default for SchedulerKind {
    fn default() -> Self {
        SchedulerKind::Local
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerKind::Local => "local",
            SchedulerKind::Slurm => "slurm",
            SchedulerKind::Sge => "sge",
            SchedulerKind::Pbs => "pbs",
            SchedulerKind::Lsf => "lsf",
        };
        f.write_str(name)
    }
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(SchedulerKind::Local),
            "slurm" => Ok(SchedulerKind::Slurm),
            "sge" | "uge" => Ok(SchedulerKind::Sge),
            "pbs" | "torque" => Ok(SchedulerKind::Pbs),
            "lsf" => Ok(SchedulerKind::Lsf),
            other => Err(format!(
                "invalid scheduler: {other} (expected local, slurm, sge, pbs or lsf)"
            )),
        }
    }
}

/// How input files are placed into the execution directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageMode {
    /// `ln -s <source> <name>`
    Symlink,
    /// `cp -fRL <source> <name>`
    Copy,
}

impl Default for StageMode {
    fn default() -> Self {
        StageMode::Symlink
    }
}
