// src/health.rs

//! Health verification through an external command.
//!
//! The exit code is the whole contract: `0` is healthy, anything else is
//! unhealthy, and a command that cannot be found is "unavailable". Output is
//! discarded.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

/// Result of one health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy,
    /// Non-zero exit code (`None` when killed by a signal or timed out).
    Unhealthy(Option<i32>),
    /// The health tool is not installed.
    Unavailable,
}

/// Trait abstracting the health check so tests can script outcomes.
pub trait HealthVerifier: Send + Sync {
    fn check(&self) -> Pin<Box<dyn Future<Output = HealthOutcome> + Send + '_>>;
}

/// Runs a command (searched on `PATH`) and maps its exit status.
#[derive(Debug, Clone)]
pub struct CommandHealthVerifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandHealthVerifier {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    async fn run(&self) -> HealthOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(command = %self.program, "health command not found");
                return HealthOutcome::Unavailable;
            }
            Err(err) => {
                warn!(command = %self.program, error = %err, "failed to spawn health command");
                return HealthOutcome::Unhealthy(None);
            }
        };

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        match waited {
            Ok(Ok(status)) => {
                info!(command = %self.program, exit_code = ?status.code(), "health command exited");
                if status.success() {
                    HealthOutcome::Healthy
                } else {
                    HealthOutcome::Unhealthy(status.code())
                }
            }
            Ok(Err(err)) => {
                warn!(command = %self.program, error = %err, "waiting for health command failed");
                HealthOutcome::Unhealthy(None)
            }
            Err(_) => {
                warn!(
                    command = %self.program,
                    timeout_secs = self.timeout.as_secs(),
                    "health command timed out"
                );
                let _ = child.kill().await;
                HealthOutcome::Unhealthy(None)
            }
        }
    }
}

impl HealthVerifier for CommandHealthVerifier {
    fn check(&self) -> Pin<Box<dyn Future<Output = HealthOutcome> + Send + '_>> {
        Box::pin(self.run())
    }
}
