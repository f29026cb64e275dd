// tests/update_scenarios.rs

use update_executor::engine::{Orchestrator, Stage, TransactionReport};
use update_executor::fs::mock::MockOp;
use update_executor::health::HealthOutcome;
use update_executor::target::TargetKind;
use update_executor::types::{UpdateRequest, UpdateStatus};
use update_executor_test_utils::{
    init_tracing, with_timeout, FakeHealth, FakeTarget, InstallFixture, RecordingReporter,
    SettingsBuilder,
};

const OLD: &[u8] = b"client v2.2.0";
const NEW: &[u8] = b"client v2.3.0";

struct Harness {
    fixture: InstallFixture,
    target: FakeTarget,
    health: FakeHealth,
    reporter: RecordingReporter,
}

impl Harness {
    fn new(fixture: InstallFixture, kind: TargetKind, health: HealthOutcome) -> Self {
        let target = FakeTarget::new(kind, fixture.fs.clone(), fixture.live_path());
        Self {
            fixture,
            target,
            health: FakeHealth::new(health),
            reporter: RecordingReporter::new(),
        }
    }

    fn staged(health: HealthOutcome) -> Self {
        Self::new(
            InstallFixture::new(OLD).stage("device-client-2.3.0", NEW),
            TargetKind::ManagedService,
            health,
        )
    }

    async fn run(&self) -> TransactionReport {
        let orchestrator = Orchestrator::new(
            &self.fixture.settings,
            &self.fixture.fs,
            &self.target,
            &self.health,
            &self.reporter,
        );
        with_timeout(orchestrator.run(UpdateRequest::new("2.3.0", Some("cmd-1".to_string())))).await
    }

    fn staging_exists(&self) -> bool {
        use update_executor::fs::FileSystem;
        self.fixture.fs.is_dir(&self.fixture.settings.staging_dir)
    }
}

fn assert_single_terminal(report: &TransactionReport, reporter: &RecordingReporter) {
    let events = reporter.events();
    assert_eq!(events, report.events);
    let terminal: Vec<_> = events.iter().filter(|e| e.is_complete()).collect();
    assert_eq!(terminal.len(), 1, "exactly one terminal event: {events:?}");
    assert!(events.last().unwrap().is_complete());
}

#[tokio::test]
async fn healthy_update_completes_and_keeps_backup() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Healthy);

    let report = h.run().await;

    assert!(report.succeeded());
    assert_eq!(
        report.stages,
        vec![
            Stage::Init,
            Stage::Backup,
            Stage::Stopping,
            Stage::Replacing,
            Stage::Starting,
            Stage::HealthCheck,
            Stage::Completed
        ]
    );
    assert_eq!(h.fixture.live_contents(), NEW);
    assert!(h.fixture.fs.is_executable(h.fixture.live_path()));

    let backups = h.fixture.backups();
    assert_eq!(backups.len(), 1);
    assert_eq!(h.fixture.fs.contents(&backups[0]).unwrap(), OLD);
    assert!(backups[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("device-client_"));

    assert!(!h.staging_exists());
    assert_eq!(h.target.last_started().unwrap(), NEW);
    assert!(h.target.is_up());
    assert_eq!(h.health.checks(), 1);

    let last = report.final_event().unwrap();
    assert_eq!(last.status, UpdateStatus::Completed);
    assert!(last.message.contains("2.3.0"));
    assert_single_terminal(&report, &h.reporter);
    assert!(h.reporter.versions().iter().all(|v| v == "2.3.0"));
}

#[tokio::test]
async fn unhealthy_update_rolls_back_to_backup() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Unhealthy(Some(1)));

    let report = h.run().await;

    assert!(!report.succeeded());
    assert!(report.rolled_back());
    assert_eq!(report.final_stage, Stage::Failed);
    assert_eq!(h.fixture.live_contents(), OLD);
    let backup = report.backup.as_ref().unwrap();
    assert_eq!(h.fixture.fs.contents(&backup.backup_path).unwrap(), OLD);

    assert!(h.target.is_up());
    assert_eq!(h.target.last_started().unwrap(), OLD);

    let last = report.final_event().unwrap();
    assert_eq!(last.status, UpdateStatus::Failed);
    assert!(last.message.contains("health check failed (exit code 1)"));
    assert!(last.message.contains("rolled back"));
    assert!(!h.staging_exists(), "consumed artifact is cleaned up");
    assert_single_terminal(&report, &h.reporter);
}

#[tokio::test]
async fn free_process_that_never_runs_triggers_rollback() {
    init_tracing();
    let settings = SettingsBuilder::new("/home/pi/device-client")
        .start_attempts(10)
        .build();
    let fixture = InstallFixture::with_settings(settings, OLD).stage("device-client", NEW);
    let h = Harness::new(fixture, TargetKind::FreeProcess, HealthOutcome::Healthy);
    let h = Harness {
        target: h.target.clone().crashes_with(NEW),
        ..h
    };

    let report = h.run().await;

    assert_eq!(report.target_kind, TargetKind::FreeProcess);
    assert!(report.rolled_back());
    assert_eq!(h.health.checks(), 0, "no health check without a running process");
    assert_eq!(h.fixture.live_contents(), OLD);
    assert!(h.target.is_up());

    let last = report.final_event().unwrap();
    assert_eq!(last.status, UpdateStatus::Failed);
    assert!(last.message.contains("failed to restart after update"));
    assert!(last.message.contains("10 checks"));
    assert_single_terminal(&report, &h.reporter);
}

#[tokio::test]
async fn missing_artifact_fails_without_touching_anything() {
    init_tracing();
    let h = Harness::new(
        InstallFixture::new(OLD),
        TargetKind::ManagedService,
        HealthOutcome::Healthy,
    );
    let files_before = h.fixture.fs.file_paths();

    for attempt in 1..=2 {
        let report = h.run().await;

        assert_eq!(report.stages, vec![Stage::Init, Stage::Failed]);
        assert_eq!(h.fixture.fs.file_paths(), files_before);
        assert_eq!(h.fixture.live_contents(), OLD);
        assert!(h.fixture.backups().is_empty());
        assert!(h.target.calls().is_empty());
        assert_eq!(h.reporter.events().len(), attempt);
        let last = report.final_event().unwrap();
        assert_eq!(last.status, UpdateStatus::Failed);
        assert!(last.message.contains("staged artifact unavailable"));
    }
}

#[tokio::test]
async fn multiple_staged_files_are_rejected_and_left_for_retry() {
    init_tracing();
    let h = Harness::new(
        InstallFixture::new(OLD)
            .stage("device-client-a", NEW)
            .stage("device-client-b", NEW),
        TargetKind::ManagedService,
        HealthOutcome::Healthy,
    );

    let report = h.run().await;

    assert_eq!(report.final_stage, Stage::Failed);
    assert!(report.final_event().unwrap().message.contains("exactly one"));
    assert!(h.staging_exists());
    assert!(h.target.calls().is_empty());
}

#[tokio::test]
async fn backup_failure_aborts_before_stopping() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Healthy);
    h.fixture
        .fs
        .fail_on(MockOp::CreateDir, &h.fixture.settings.backup_dir);

    let report = h.run().await;

    assert_eq!(report.stages, vec![Stage::Init, Stage::Backup, Stage::Failed]);
    assert!(report.final_event().unwrap().message.contains("backup failed"));
    assert!(h.target.calls().is_empty());
    assert_eq!(h.fixture.live_contents(), OLD);
    assert!(h.staging_exists());
}

#[tokio::test]
async fn unavailable_health_tool_completes_with_warning() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Unavailable);

    let report = h.run().await;

    assert!(report.succeeded());
    assert!(!report.rolled_back());
    assert_eq!(h.fixture.live_contents(), NEW);
    assert!(report
        .final_event()
        .unwrap()
        .message
        .contains("health check unavailable"));
}

#[tokio::test]
async fn replace_failure_rolls_back_and_keeps_staging() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Healthy);
    h.fixture.fs.fail_once(MockOp::Replace, h.fixture.live_path());

    let report = h.run().await;

    assert!(report.rolled_back());
    assert!(!report.artifact_consumed);
    assert_eq!(h.fixture.live_contents(), OLD);
    assert_eq!(h.target.last_started().unwrap(), OLD);
    assert!(h.staging_exists(), "unconsumed artifact stays for a retry");
    assert!(report
        .final_event()
        .unwrap()
        .message
        .contains("failed to install new binary"));
}

#[tokio::test]
async fn stop_error_enters_rollback() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Healthy);
    let h = Harness {
        target: h.target.clone().failing_stop(),
        ..h
    };

    let report = h.run().await;

    assert_eq!(
        report.stages,
        vec![
            Stage::Init,
            Stage::Backup,
            Stage::Stopping,
            Stage::RollingBack,
            Stage::Failed
        ]
    );
    assert_eq!(h.fixture.live_contents(), OLD);
    assert!(report.final_event().unwrap().message.contains("failed to stop"));
    assert!(h.staging_exists());
}

#[tokio::test]
async fn already_stopped_target_is_not_an_error() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Healthy);
    let h = Harness {
        target: h.target.clone().not_running(),
        ..h
    };

    let report = h.run().await;

    assert!(report.succeeded());
    assert_eq!(h.target.last_started().unwrap(), NEW);
}

#[tokio::test]
async fn failed_restore_is_reported_distinctly() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Unhealthy(Some(2)));
    let h = Harness {
        target: h.target.clone().crashes_with(OLD),
        ..h
    };

    let report = h.run().await;

    assert_eq!(report.final_stage, Stage::Failed);
    let last = report.final_event().unwrap();
    assert!(last.message.starts_with("failed to restore previous version"));
    assert!(last.message.contains("health check failed (exit code 2)"));
    // The restore itself happened; only the restart did not come up.
    assert_eq!(h.fixture.live_contents(), OLD);
    assert!(!h.target.is_up());
    assert_single_terminal(&report, &h.reporter);
}

#[tokio::test]
async fn vanished_backup_is_a_failed_restore() {
    init_tracing();
    let h = Harness::staged(HealthOutcome::Unhealthy(Some(1)));
    let fs = h.fixture.fs.clone();
    let backup_dir = h.fixture.settings.backup_dir.clone();
    let target = h.target.clone();

    let remover = tokio::spawn(async move {
        loop {
            if target.last_started().is_some() {
                for path in fs.file_paths() {
                    if path.starts_with(&backup_dir) {
                        fs.remove_file(&path);
                    }
                }
                break;
            }
            tokio::task::yield_now().await;
        }
    });
    let report = h.run().await;
    remover.abort();

    let last = report.final_event().unwrap();
    assert_eq!(last.status, UpdateStatus::Failed);
    assert!(last.message.contains("failed to restore previous version"));
    assert!(last.message.contains("vanished"));
}
