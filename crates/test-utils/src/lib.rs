// crates/test-utils/src/lib.rs

//! Shared helpers for gridrun's integration tests.

pub mod builders;
pub mod fake_dialect;

use std::sync::Once;
use std::time::{Duration, Instant};

use gridrun::logging::{build_filter, LOG_ENV};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// Honours `GRIDRUN_LOG` like the binary does; output is captured by the
/// harness and shown for failing tests only.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env = std::env::var(LOG_ENV).ok();
        let filter = build_filter(None, env.as_deref()).unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("test timed out after 10 seconds")
}

/// Poll `done` every 50ms until it returns `true` or `deadline` passes.
pub fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    done()
}
