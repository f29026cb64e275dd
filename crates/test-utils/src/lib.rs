//! Shared fixtures for the update-executor test suites.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{InstallFixture, SettingsBuilder};
pub use fakes::{FakeHealth, FakeTarget, RecordingReporter, TargetCall};

/// Upper bound for a single awaited step in a test.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Route crate logs into the test harness (shown for failing tests only).
///
/// `RUST_LOG` overrides the default of `update_executor=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,update_executor=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`STEP_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(STEP_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("step did not finish within {STEP_TIMEOUT:?}"))
}
