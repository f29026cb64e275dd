// src/target/mod.rs

//! Runtime target abstraction: "the thing currently running the executable".
//!
//! - [`service`] drives a systemd unit through `systemctl`.
//! - [`process`] manages a free-running process matched by executable name.
//!
//! Which variant applies is decided once per transaction by
//! [`resolve_target`]; the orchestrator only ever sees `dyn RuntimeTarget`, so
//! the forward path and the rollback path share one substrate and one polling
//! implementation ([`wait_for_state`]).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, info};

use crate::config::{PollPolicy, Settings};

pub mod process;
pub mod service;

pub use process::FreeProcessTarget;
pub use service::ServiceTarget;

/// Boxed future returned by [`RuntimeTarget`] operations.
pub type TargetFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Which substrate runs the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    ManagedService,
    FreeProcess,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::ManagedService => f.write_str("managed service"),
            TargetKind::FreeProcess => f.write_str("free process"),
        }
    }
}

/// Result of a stop request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Nothing was running; the stop was bypassed.
    AlreadyStopped,
}

/// Uniform stop / start / is-running capability.
///
/// Production code uses [`ServiceTarget`] or [`FreeProcessTarget`]; tests can
/// provide their own implementation that doesn't touch real processes.
pub trait RuntimeTarget: Send + Sync {
    fn kind(&self) -> TargetKind;

    /// Human-readable identity (unit name or executable path).
    fn describe(&self) -> String;

    /// Stop whatever is running. Errors only when stopping actively failed.
    fn stop(&self) -> TargetFuture<'_, StopOutcome>;

    /// Ask the substrate to start the executable. Does not wait for it.
    fn start(&self) -> TargetFuture<'_, ()>;

    fn is_running(&self) -> TargetFuture<'_, bool>;
}

/// Poll `target` until `is_running() == want_running`, at most
/// `policy.attempts` times with `policy.interval` between checks.
///
/// Returns whether the desired state was observed. A failing probe counts as
/// "not in the desired state" for that attempt.
pub async fn wait_for_state(
    target: &dyn RuntimeTarget,
    want_running: bool,
    policy: PollPolicy,
) -> bool {
    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;
        match target.is_running().await {
            Ok(running) if running == want_running => {
                debug!(attempt, want_running, target = %target.describe(), "target reached state");
                return true;
            }
            Ok(_) => {
                debug!(attempt, max = policy.attempts, want_running, "target not yet in state");
            }
            Err(err) => {
                debug!(attempt, error = %err, "target state probe failed");
            }
        }
    }
    false
}

/// Start the target and wait for it to report running.
pub async fn start_and_wait(target: &dyn RuntimeTarget, policy: PollPolicy) -> anyhow::Result<()> {
    target.start().await?;
    if wait_for_state(target, true, policy).await {
        Ok(())
    } else {
        anyhow::bail!(
            "{} did not report running after {} checks",
            target.describe(),
            policy.attempts
        )
    }
}

/// Pick the runtime target for this transaction.
///
/// A registered systemd unit named `settings.service_name` wins; otherwise the
/// live executable is managed as a free process.
pub async fn resolve_target(settings: &Settings) -> Box<dyn RuntimeTarget> {
    let service = ServiceTarget::new(&settings.service_name);
    if service.is_registered().await {
        info!(unit = %service.unit(), "runtime target: managed service");
        Box::new(service)
    } else {
        let process = FreeProcessTarget::new(settings.live_executable(), settings.stop_poll);
        info!(executable = %process.describe(), "runtime target: free process");
        Box::new(process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Reports running after a fixed number of probes.
    struct Countdown {
        remaining: Mutex<u32>,
    }

    impl RuntimeTarget for Countdown {
        fn kind(&self) -> TargetKind {
            TargetKind::FreeProcess
        }

        fn describe(&self) -> String {
            "countdown".to_string()
        }

        fn stop(&self) -> TargetFuture<'_, StopOutcome> {
            Box::pin(async { Ok(StopOutcome::Stopped) })
        }

        fn start(&self) -> TargetFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn is_running(&self) -> TargetFuture<'_, bool> {
            Box::pin(async move {
                let mut left = self.remaining.lock().unwrap();
                if *left == 0 {
                    return Ok(true);
                }
                *left -= 1;
                Ok(false)
            })
        }
    }

    fn policy(attempts: u32) -> PollPolicy {
        PollPolicy::new(attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn wait_succeeds_within_bound() {
        let target = Countdown {
            remaining: Mutex::new(3),
        };
        assert!(wait_for_state(&target, true, policy(4)).await);
    }

    #[tokio::test]
    async fn wait_gives_up_after_bound() {
        let target = Countdown {
            remaining: Mutex::new(3),
        };
        assert!(!wait_for_state(&target, true, policy(3)).await);
    }

    #[tokio::test]
    async fn start_and_wait_reports_timeout() {
        let target = Countdown {
            remaining: Mutex::new(10),
        };
        let err = start_and_wait(&target, policy(2)).await.unwrap_err();
        assert!(err.to_string().contains("did not report running after 2 checks"));
    }
}
