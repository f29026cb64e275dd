// tests/free_process.rs

#![cfg(target_os = "linux")]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use sysinfo::System;
use update_executor::config::PollPolicy;
use update_executor::target::{
    start_and_wait, wait_for_state, FreeProcessTarget, RuntimeTarget, StopOutcome, TargetKind,
};
use update_executor_test_utils::init_tracing;

/// A tiny long-running "client": a shell script whose `comm` is its file name.
fn write_client(dir: &std::path::Path) -> PathBuf {
    let name = format!("uxc{}", std::process::id());
    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\nwhile :; do sleep 1; done\n").unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Processes named `name` whose session id is their own pid.
fn session_leaders(name: &str) -> usize {
    let mut sys = System::new();
    sys.refresh_processes();
    sys.processes()
        .iter()
        .filter(|(_, p)| p.name() == name)
        .filter(|(pid, p)| p.session_id() == Some(**pid))
        .count()
}

#[tokio::test]
async fn start_detects_running_and_stop_terminates() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let exe = write_client(dir.path());
    let policy = PollPolicy::new(50, Duration::from_millis(100));
    let name = exe.file_name().unwrap().to_string_lossy().into_owned();
    let target = FreeProcessTarget::new(exe, policy);

    assert_eq!(target.kind(), TargetKind::FreeProcess);
    assert!(!target.is_running().await.unwrap());

    start_and_wait(&target, policy).await.unwrap();
    assert!(target.is_running().await.unwrap());
    assert_eq!(session_leaders(&name), 1, "client should lead its own session");

    assert_eq!(target.stop().await.unwrap(), StopOutcome::Stopped);
    assert!(wait_for_state(&target, false, policy).await);
    assert_eq!(target.stop().await.unwrap(), StopOutcome::AlreadyStopped);
}

#[tokio::test]
async fn binary_that_exits_immediately_never_counts_as_running() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join(format!("uxq{}", std::process::id()));
    fs::write(&exe, "#!/bin/sh\nexit 1\n").unwrap();
    let mut perms = fs::metadata(&exe).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&exe, perms).unwrap();

    let policy = PollPolicy::new(3, Duration::from_millis(100));
    let target = FreeProcessTarget::new(exe, policy);

    let err = start_and_wait(&target, policy).await.unwrap_err();
    assert!(err.to_string().contains("did not report running after 3 checks"));
}
