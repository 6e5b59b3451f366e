// src/scheduler/local.rs

use super::{SchedulerDialect, SubmitRequest};

/// Runs the wrapper as a detached background process on this host.
///
/// The submit command returns immediately after printing the wrapper's PID,
/// which then plays the role of the job id. The submitter already runs it
/// from the work directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDialect;

impl SchedulerDialect for LocalDialect {
    fn name(&self) -> &'static str {
        "local"
    }

    fn submit_command(&self, req: &SubmitRequest) -> Vec<String> {
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "nohup /bin/bash \"$1\" > \"$2\" 2>&1 < /dev/null & echo $!".to_string(),
            "gridrun-local".to_string(),
            req.wrapper_arg(),
            req.output_arg(),
        ]
    }

    fn kill_command(&self, job_id: &str) -> Vec<String> {
        // Children first: bash defers its TERM trap while a foreground child runs.
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "pkill -TERM -P \"$1\" 2>/dev/null; kill -TERM \"$1\"".to_string(),
            "gridrun-kill".to_string(),
            job_id.to_string(),
        ]
    }
}
