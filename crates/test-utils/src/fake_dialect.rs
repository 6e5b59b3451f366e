// crates/test-utils/src/fake_dialect.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use gridrun::scheduler::{SchedulerDialect, SubmitRequest};
use tempfile::TempDir;

/// How the fake scheduler answers a submit.
#[derive(Debug, Clone)]
pub enum FakeSubmit {
    /// Run the wrapper to completion inside the submit command, then print
    /// `job_id`. Markers are in place by the time submit returns.
    RunInline { job_id: String },
    /// Print `output` and exit 0 without running anything.
    Accept { output: String },
    /// Print `output` to stderr and exit with `code`.
    Reject { code: i32, output: String },
}

/// Scheduler stand-in built from plain `sh` commands.
///
/// Records every submitted job name. Cancelled job ids are appended to a
/// file by the cancel command itself, so [`FakeDialect::killed`] only lists
/// cancels that actually ran.
#[derive(Debug, Clone)]
pub struct FakeDialect {
    behaviour: FakeSubmit,
    submitted: Arc<Mutex<Vec<String>>>,
    kill_log: Arc<TempDir>,
}

impl FakeDialect {
    pub fn new(behaviour: FakeSubmit) -> Self {
        Self {
            behaviour,
            submitted: Arc::new(Mutex::new(Vec::new())),
            kill_log: Arc::new(TempDir::new().expect("create kill log dir")),
        }
    }

    pub fn run_inline(job_id: &str) -> Self {
        Self::new(FakeSubmit::RunInline {
            job_id: job_id.to_string(),
        })
    }

    pub fn accept(output: &str) -> Self {
        Self::new(FakeSubmit::Accept {
            output: output.to_string(),
        })
    }

    pub fn reject(code: i32, output: &str) -> Self {
        Self::new(FakeSubmit::Reject {
            code,
            output: output.to_string(),
        })
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    /// Job ids whose cancel command has run, in order.
    pub fn killed(&self) -> Vec<String> {
        std::fs::read_to_string(self.kill_log_file())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn kill_log_file(&self) -> PathBuf {
        self.kill_log.path().join("killed")
    }
}

impl SchedulerDialect for FakeDialect {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn submit_command(&self, req: &SubmitRequest) -> Vec<String> {
        self.submitted.lock().unwrap().push(req.name.clone());

        let sh = |script: &str, args: &[String]| {
            let mut argv = vec!["sh".to_string(), "-c".to_string(), script.to_string(), "fake".to_string()];
            argv.extend(args.iter().cloned());
            argv
        };

        match &self.behaviour {
            FakeSubmit::RunInline { job_id } => sh(
                "/bin/bash \"$1\" > \"$2\" 2>&1 < /dev/null; printf '%s\\n' \"$3\"",
                &[
                    req.wrapper.to_string_lossy().into_owned(),
                    req.scheduler_output.to_string_lossy().into_owned(),
                    job_id.clone(),
                ],
            ),
            FakeSubmit::Accept { output } => sh("printf '%s' \"$1\"", &[output.clone()]),
            FakeSubmit::Reject { code, output } => sh(
                "printf '%s\\n' \"$1\" >&2; exit \"$2\"",
                &[output.clone(), code.to_string()],
            ),
        }
    }

    fn kill_command(&self, job_id: &str) -> Vec<String> {
        vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf '%s\\n' \"$1\" >> \"$2\"".to_string(),
            "fake-kill".to_string(),
            job_id.to_string(),
            self.kill_log_file().to_string_lossy().into_owned(),
        ]
    }
}
