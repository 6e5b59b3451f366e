// src/scheduler/lsf.rs

use std::sync::LazyLock;

use regex::Regex;

use super::{last_non_blank_line, SchedulerDialect, SubmitRequest};

static LSF_JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Job <(\d+)>").expect("static LSF job id regex"));

/// IBM LSF: `bsub` / `bkill`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsfDialect;

impl SchedulerDialect for LsfDialect {
    fn name(&self) -> &'static str {
        "lsf"
    }

    fn submit_command(&self, req: &SubmitRequest) -> Vec<String> {
        let mut argv = vec![
            "bsub".to_string(),
            "-J".to_string(),
            req.job_name(128),
            "-cwd".to_string(),
            req.work_dir_arg(),
            "-o".to_string(),
            req.output_arg(),
        ];

        if let Some(queue) = &req.queue {
            argv.push("-q".to_string());
            argv.push(queue.clone());
        }
        if let Some(cpus) = req.cpus {
            argv.push("-n".to_string());
            argv.push(cpus.to_string());
        }
        if let Some(time) = &req.time {
            // -W takes [hours:]minutes
            let minutes = time.effective_limit().as_minutes();
            argv.push("-W".to_string());
            argv.push(format!("{:02}:{:02}", minutes / 60, minutes % 60));
        }
        if let Some(memory) = &req.memory {
            let mega = memory.effective_limit().as_mega();
            argv.push("-M".to_string());
            argv.push(mega.to_string());
            argv.push("-R".to_string());
            argv.push(format!("rusage[mem={}]", memory.effective_request().as_mega()));
        }
        argv.extend(req.cluster_options.iter().cloned());
        argv.push(req.wrapper_arg());
        argv
    }

    fn kill_command(&self, job_id: &str) -> Vec<String> {
        vec!["bkill".to_string(), job_id.to_string()]
    }

    /// `Job <123> is submitted to queue <normal>.`
    fn parse_job_id(&self, output: &str) -> Option<String> {
        LSF_JOB_ID
            .captures_iter(output)
            .last()
            .map(|caps| caps[1].to_string())
            .or_else(|| last_non_blank_line(output))
    }
}
