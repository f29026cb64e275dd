// src/target/process.rs

//! Free-running process target, matched by executable base name.

#[cfg(unix)]
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;
use sysinfo::{Pid, ProcessStatus, Signal, System};
use tokio::process::Command;
use tracing::{info, warn};

use super::{wait_for_state, RuntimeTarget, StopOutcome, TargetFuture, TargetKind};
use crate::config::PollPolicy;

/// Linux truncates `comm` to 15 bytes.
const COMM_LEN: usize = 15;

/// Appended by the kernel to `/proc/<pid>/exe` once the file was replaced.
const DELETED_SUFFIX: &str = " (deleted)";

/// The executable running outside any service manager.
#[derive(Debug, Clone)]
pub struct FreeProcessTarget {
    executable: PathBuf,
    name: String,
    stop_poll: PollPolicy,
}

impl FreeProcessTarget {
    pub fn new(executable: PathBuf, stop_poll: PollPolicy) -> Self {
        let name = executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            executable,
            name,
            stop_poll,
        }
    }

    /// Pids of live (non-zombie) processes running our executable.
    fn matching_pids(&self, sys: &System) -> Vec<Pid> {
        let own = sysinfo::get_current_pid().ok();
        sys.processes()
            .iter()
            .filter(|(pid, _)| Some(**pid) != own)
            .filter(|(_, p)| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
            .filter(|(_, p)| process_matches(p.name(), p.exe(), &self.name))
            .map(|(pid, _)| *pid)
            .collect()
    }

    fn scan(&self) -> Vec<Pid> {
        let mut sys = System::new();
        sys.refresh_processes();
        self.matching_pids(&sys)
    }

    /// Send `signal` to every matching process; returns how many were signalled.
    fn signal_all(&self, signal: Signal) -> usize {
        let mut sys = System::new();
        sys.refresh_processes();
        let mut sent = 0;
        for pid in self.matching_pids(&sys) {
            let Some(process) = sys.process(pid) else {
                continue;
            };
            let delivered = match process.kill_with(signal) {
                Some(ok) => ok,
                None => process.kill(),
            };
            if delivered {
                sent += 1;
            } else {
                warn!(pid = pid.as_u32(), ?signal, "failed to signal process");
            }
        }
        sent
    }
}

impl RuntimeTarget for FreeProcessTarget {
    fn kind(&self) -> TargetKind {
        TargetKind::FreeProcess
    }

    fn describe(&self) -> String {
        self.executable.display().to_string()
    }

    fn stop(&self) -> TargetFuture<'_, StopOutcome> {
        Box::pin(async move {
            if self.scan().is_empty() {
                info!(process = %self.name, "no running process; nothing to stop");
                return Ok(StopOutcome::AlreadyStopped);
            }

            let sent = self.signal_all(Signal::Term);
            info!(process = %self.name, sent, "sent SIGTERM");
            if wait_for_state(self, false, self.stop_poll).await {
                return Ok(StopOutcome::Stopped);
            }

            warn!(
                process = %self.name,
                attempts = self.stop_poll.attempts,
                "process ignored SIGTERM; escalating to SIGKILL"
            );
            self.signal_all(Signal::Kill);
            if wait_for_state(self, false, self.stop_poll).await {
                return Ok(StopOutcome::Stopped);
            }
            anyhow::bail!("process '{}' survived SIGKILL", self.name)
        })
    }

    fn start(&self) -> TargetFuture<'_, ()> {
        Box::pin(async move {
            let mut cmd = Command::new(&self.executable);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(false);
            if let Some(dir) = self.executable.parent() {
                cmd.current_dir(dir);
            }
            // New session: the client must outlive the executor and its terminal.
            #[cfg(unix)]
            // SAFETY: setsid is async-signal-safe and touches no parent memory.
            unsafe {
                cmd.pre_exec(|| nix::unistd::setsid().map(drop).map_err(io::Error::from));
            }

            let child = cmd
                .spawn()
                .with_context(|| format!("spawning {}", self.executable.display()))?;
            info!(
                executable = %self.executable.display(),
                pid = child.id(),
                "launched detached process"
            );
            Ok(())
        })
    }

    fn is_running(&self) -> TargetFuture<'_, bool> {
        Box::pin(async move { Ok::<_, anyhow::Error>(!self.scan().is_empty()) })
    }
}

/// Whether a process table entry belongs to `wanted` (a base name).
///
/// A readable `exe` decides on its own, except that an exact `comm` match
/// still counts (scripts run through an interpreter). The 15-byte `comm`
/// prefix is only trusted when `exe` is unreadable.
pub fn process_matches(name: &str, exe: Option<&Path>, wanted: &str) -> bool {
    if wanted.is_empty() {
        return false;
    }
    if name == wanted {
        return true;
    }
    match exe.and_then(|p| p.file_name()) {
        Some(file) => {
            let file = file.to_string_lossy();
            file.strip_suffix(DELETED_SUFFIX).unwrap_or(&file) == wanted
        }
        None => wanted.len() > COMM_LEN && wanted.get(..COMM_LEN) == Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn matches_by_exe_file_name_or_comm() {
        let wanted = "device-client";
        assert!(process_matches("device-client", None, wanted));
        assert!(process_matches(
            "sh",
            Some(Path::new("/opt/device-client/device-client")),
            wanted
        ));
        assert!(!process_matches("device-client-cli", None, wanted));
        assert!(!process_matches("", None, ""));
    }

    #[test]
    fn truncated_comm_only_counts_without_exe() {
        let wanted = "device-client-daemon";
        assert!(process_matches("device-client-d", None, wanted));
        assert!(!process_matches("device-client-x", None, wanted));

        // `device-client-diag` has the same 15-byte comm.
        assert!(!process_matches(
            "device-client-d",
            Some(Path::new("/usr/bin/device-client-diag")),
            wanted
        ));
        assert!(process_matches(
            "device-client-d",
            Some(Path::new("/opt/device-client/device-client-daemon")),
            wanted
        ));
    }

    #[test]
    fn replaced_executable_still_matches() {
        assert!(process_matches(
            "sh",
            Some(Path::new("/opt/device-client/device-client (deleted)")),
            "device-client"
        ));
        assert!(!process_matches(
            "sh",
            Some(Path::new("/opt/device-client/other (deleted)")),
            "device-client"
        ));
    }

    #[tokio::test]
    async fn nothing_running_for_unknown_executable() {
        let target = FreeProcessTarget::new(
            PathBuf::from("/nonexistent/no-such-client-7f3a"),
            PollPolicy::new(1, Duration::from_millis(1)),
        );
        assert!(!target.is_running().await.unwrap());
        assert_eq!(target.stop().await.unwrap(), StopOutcome::AlreadyStopped);
        assert!(target.start().await.is_err());
    }
}
