// src/scheduler/pbs.rs

use super::{SchedulerDialect, SubmitRequest};

/// PBS/Torque job names are limited to 15 characters.
const PBS_JOB_NAME_MAX: usize = 15;

/// PBS/Torque: `qsub` / `qdel`.
///
/// PBS has no working-directory flag; the wrapper changes into the work
/// directory itself. Job ids look like `123.server` and are kept whole since
/// `qdel` needs the server suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct PbsDialect;

impl SchedulerDialect for PbsDialect {
    fn name(&self) -> &'static str {
        "pbs"
    }

    fn submit_command(&self, req: &SubmitRequest) -> Vec<String> {
        let mut argv = vec![
            "qsub".to_string(),
            "-N".to_string(),
            req.job_name(PBS_JOB_NAME_MAX),
            "-o".to_string(),
            req.output_arg(),
            "-j".to_string(),
            "oe".to_string(),
        ];

        if let Some(queue) = &req.queue {
            argv.push("-q".to_string());
            argv.push(queue.clone());
        }
        if let Some(cpus) = req.cpus {
            argv.push("-l".to_string());
            argv.push(format!("nodes=1:ppn={cpus}"));
        }
        if let Some(time) = &req.time {
            argv.push("-l".to_string());
            argv.push(format!("walltime={}", time.effective_limit().to_hms()));
        }
        if let Some(memory) = &req.memory {
            argv.push("-l".to_string());
            argv.push(format!("mem={}mb", memory.effective_limit().as_mega()));
        }
        argv.extend(req.cluster_options.iter().cloned());
        argv.push(req.wrapper_arg());
        argv
    }

    fn kill_command(&self, job_id: &str) -> Vec<String> {
        vec!["qdel".to_string(), job_id.to_string()]
    }
}
