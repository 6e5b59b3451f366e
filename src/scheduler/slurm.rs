// src/scheduler/slurm.rs

use super::{last_non_blank_line, SchedulerDialect, SubmitRequest};
use crate::task::TimeSpan;

/// Slurm: `sbatch --parsable` / `scancel`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlurmDialect;

impl SchedulerDialect for SlurmDialect {
    fn name(&self) -> &'static str {
        "slurm"
    }

    fn submit_command(&self, req: &SubmitRequest) -> Vec<String> {
        let mut argv = vec![
            "sbatch".to_string(),
            "--parsable".to_string(),
            "--job-name".to_string(),
            req.job_name(128),
            "--chdir".to_string(),
            req.work_dir_arg(),
            "--output".to_string(),
            req.output_arg(),
            "--no-requeue".to_string(),
        ];

        if let Some(queue) = &req.queue {
            argv.push("--partition".to_string());
            argv.push(queue.clone());
        }
        if let Some(cpus) = req.cpus {
            argv.push("--cpus-per-task".to_string());
            argv.push(cpus.to_string());
        }
        if let Some(time) = &req.time {
            argv.push("--time".to_string());
            argv.push(slurm_time(time.effective_limit()));
        }
        if let Some(memory) = &req.memory {
            argv.push("--mem".to_string());
            argv.push(format!("{}M", memory.effective_limit().as_mega()));
        }
        argv.extend(req.cluster_options.iter().cloned());
        argv.push(req.wrapper_arg());
        argv
    }

    fn kill_command(&self, job_id: &str) -> Vec<String> {
        vec!["scancel".to_string(), job_id.to_string()]
    }

    /// `--parsable` prints `<id>` or `<id>;<cluster>`; without it sbatch
    /// prints `Submitted batch job <id>`.
    fn parse_job_id(&self, output: &str) -> Option<String> {
        let line = last_non_blank_line(output)?;
        let id = match line.strip_prefix("Submitted batch job ") {
            Some(rest) => rest.trim(),
            None => line.split(';').next().unwrap_or(&line).trim(),
        };
        (!id.is_empty()).then(|| id.to_string())
    }
}

/// `[D-]HH:MM:SS`
fn slurm_time(time: &TimeSpan) -> String {
    let secs = time.as_duration().as_secs();
    let days = secs / 86_400;
    let rest = secs % 86_400;
    let hms = format!("{:02}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);
    if days > 0 {
        format!("{days}-{hms}")
    } else {
        hms
    }
}
