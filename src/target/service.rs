// src/target/service.rs

//! systemd-managed runtime target.

use std::io;
use std::process::{Output, Stdio};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use super::{RuntimeTarget, StopOutcome, TargetFuture, TargetKind};

/// A systemd unit driven through `systemctl`.
#[derive(Debug, Clone)]
pub struct ServiceTarget {
    unit: String,
    program: String,
}

impl ServiceTarget {
    pub fn new(name: &str) -> Self {
        Self::with_program(name, "systemctl")
    }

    /// Use a different `systemctl`-compatible program (tests, wrappers).
    pub fn with_program(name: &str, program: impl Into<String>) -> Self {
        Self {
            unit: unit_name(name),
            program: program.into(),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Whether a unit definition with this name is installed on the host.
    ///
    /// A missing `systemctl` binary means "no".
    pub async fn is_registered(&self) -> bool {
        let args = list_unit_files_args(&self.unit);
        match self.run(&args).await {
            Ok(output) => {
                let listed = output.status.success()
                    && !String::from_utf8_lossy(&output.stdout).trim().is_empty();
                debug!(unit = %self.unit, listed, "probed unit files");
                listed
            }
            Err(err) => {
                debug!(unit = %self.unit, error = %err, "systemctl unavailable");
                false
            }
        }
    }

    async fn run(&self, args: &[&str]) -> io::Result<Output> {
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
    }

    async fn run_checked(&self, args: &[&str]) -> Result<()> {
        let output = self
            .run(args)
            .await
            .with_context(|| format!("running {} {}", self.program, args.join(" ")))?;
        if !output.status.success() {
            anyhow::bail!(
                "{} {} exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn active(&self) -> Result<bool> {
        let status = Command::new(&self.program)
            .args(is_active_args(&self.unit))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("running {} is-active", self.program))?;
        Ok(status.success())
    }
}

impl RuntimeTarget for ServiceTarget {
    fn kind(&self) -> TargetKind {
        TargetKind::ManagedService
    }

    fn describe(&self) -> String {
        self.unit.clone()
    }

    fn stop(&self) -> TargetFuture<'_, StopOutcome> {
        Box::pin(async move {
            if !self.active().await.unwrap_or(true) {
                info!(unit = %self.unit, "service not active; nothing to stop");
                return Ok(StopOutcome::AlreadyStopped);
            }
            self.run_checked(&["stop", self.unit.as_str()]).await?;
            info!(unit = %self.unit, "service stopped");
            Ok(StopOutcome::Stopped)
        })
    }

    fn start(&self) -> TargetFuture<'_, ()> {
        Box::pin(async move {
            self.run_checked(&["start", self.unit.as_str()]).await?;
            info!(unit = %self.unit, "service start requested");
            Ok(())
        })
    }

    fn is_running(&self) -> TargetFuture<'_, bool> {
        Box::pin(self.active())
    }
}

/// Normalise a service name to a full unit name.
pub fn unit_name(name: &str) -> String {
    let name = name.trim();
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{name}.service")
    }
}

fn list_unit_files_args(unit: &str) -> [&str; 4] {
    ["list-unit-files", unit, "--no-legend", "--no-pager"]
}

fn is_active_args(unit: &str) -> [&str; 3] {
    ["is-active", "--quiet", unit]
}
