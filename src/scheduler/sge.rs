// src/scheduler/sge.rs

use super::{last_non_blank_line, SchedulerDialect, SubmitRequest};

/// Grid Engine (SGE/UGE): `qsub -terse` / `qdel`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SgeDialect;

impl SchedulerDialect for SgeDialect {
    fn name(&self) -> &'static str {
        "sge"
    }

    fn submit_command(&self, req: &SubmitRequest) -> Vec<String> {
        let mut argv = vec![
            "qsub".to_string(),
            "-terse".to_string(),
            "-wd".to_string(),
            req.work_dir_arg(),
            "-N".to_string(),
            req.job_name(128),
            "-o".to_string(),
            req.output_arg(),
            "-j".to_string(),
            "y".to_string(),
            "-V".to_string(),
            "-notify".to_string(),
        ];

        if let Some(queue) = &req.queue {
            argv.push("-q".to_string());
            argv.push(queue.clone());
        }
        if let Some(cpus) = req.cpus.filter(|&c| c > 1) {
            argv.push("-pe".to_string());
            argv.push("smp".to_string());
            argv.push(cpus.to_string());
        }
        if let Some(time) = &req.time {
            argv.push("-l".to_string());
            argv.push(format!("h_rt={}", time.effective_limit().to_hms()));
        }
        if let Some(memory) = &req.memory {
            argv.push("-l".to_string());
            argv.push(format!("h_vmem={}M", memory.effective_limit().as_mega()));
        }
        argv.extend(req.cluster_options.iter().cloned());
        argv.push(req.wrapper_arg());
        argv
    }

    fn kill_command(&self, job_id: &str) -> Vec<String> {
        vec!["qdel".to_string(), job_id.to_string()]
    }

    /// `-terse` prints the bare id, or `<id>.<range>` for array jobs.
    fn parse_job_id(&self, output: &str) -> Option<String> {
        let line = last_non_blank_line(output)?;
        let id = line.split('.').next().unwrap_or(&line).trim();
        (!id.is_empty()).then(|| id.to_string())
    }
}
