// src/engine/orchestrator.rs

//! The update orchestrator: IO shell around the pure [`Transaction`] core.
//!
//! Sequence on the happy path:
//! `Init → Backup → Stopping → Replacing → Starting → HealthCheck → Completed`.
//! Any failure from `Stopping` onward goes through `RollingBack` and ends in
//! `Failed`. Nothing in here returns an error to the caller: every outcome is
//! expressed as the final stage and status of the [`TransactionReport`].

use std::path::Path;

use tracing::{error, info, warn};

use crate::backup::BackupManager;
use crate::config::Settings;
use crate::engine::stage::{Stage, Transaction, TransactionReport};
use crate::fs::FileSystem;
use crate::health::{HealthOutcome, HealthVerifier};
use crate::report::StatusReporter;
use crate::staging::locate_artifact;
use crate::target::{start_and_wait, RuntimeTarget, StopOutcome};
use crate::types::{StatusEvent, UpdateRequest, UpdateStatus};

/// Everything one transaction needs, resolved up front.
pub struct Orchestrator<'a> {
    settings: &'a Settings,
    fs: &'a dyn FileSystem,
    target: &'a dyn RuntimeTarget,
    health: &'a dyn HealthVerifier,
    reporter: &'a dyn StatusReporter,
    backups: BackupManager,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        settings: &'a Settings,
        fs: &'a dyn FileSystem,
        target: &'a dyn RuntimeTarget,
        health: &'a dyn HealthVerifier,
        reporter: &'a dyn StatusReporter,
    ) -> Self {
        Self {
            settings,
            fs,
            target,
            health,
            reporter,
            backups: BackupManager::new(settings.backup_dir.clone()),
        }
    }

    /// Run one update transaction to a terminal status.
    pub async fn run(&self, request: UpdateRequest) -> TransactionReport {
        let mut tx = Transaction::new(request, self.target.kind());
        let live = self.settings.live_executable();

        info!(
            version = %tx.request.version,
            command_id = %tx.request.command_id,
            target = %self.target.describe(),
            kind = %self.target.kind(),
            "starting update transaction"
        );

        let artifact = match locate_artifact(self.fs, &self.settings.staging_dir) {
            Ok(artifact) => artifact,
            Err(err) => {
                return self
                    .finish(tx, Stage::Failed, format!("staged artifact unavailable: {err}"))
                    .await;
            }
        };
        info!(artifact = %artifact.path.display(), "found staged artifact");

        self.enter(&mut tx, Stage::Backup, "backing up current version").await;
        match self.backups.snapshot(self.fs, &live) {
            Ok(backup) => tx.backup = Some(backup),
            Err(err) => {
                return self
                    .finish(tx, Stage::Failed, format!("backup failed: {err:#}"))
                    .await;
            }
        }

        let stopping = format!("stopping {}", self.target.describe());
        self.enter(&mut tx, Stage::Stopping, &stopping).await;
        match self.target.stop().await {
            Ok(StopOutcome::Stopped) => {}
            Ok(StopOutcome::AlreadyStopped) => {
                info!("target was not running; continuing");
            }
            Err(err) => {
                return self.roll_back(tx, format!("failed to stop: {err:#}")).await;
            }
        }

        let installing = format!("installing version {}", tx.request.version);
        self.enter(&mut tx, Stage::Replacing, &installing).await;
        if let Err(err) = self.fs.replace_executable(&artifact.path, &live) {
            return self
                .roll_back(tx, format!("failed to install new binary: {err:#}"))
                .await;
        }
        tx.artifact_consumed = true;

        let starting = format!("starting version {}", tx.request.version);
        self.enter(&mut tx, Stage::Starting, &starting).await;
        if let Err(err) = start_and_wait(self.target, self.settings.start_poll).await {
            return self
                .roll_back(tx, format!("failed to restart after update: {err:#}"))
                .await;
        }

        self.enter(&mut tx, Stage::HealthCheck, "verifying health").await;
        tokio::time::sleep(self.settings.settle_delay).await;
        match self.health.check().await {
            HealthOutcome::Healthy => {
                let msg = format!("updated to version {}", tx.request.version);
                self.finish(tx, Stage::Completed, msg).await
            }
            HealthOutcome::Unavailable => {
                warn!(
                    command = %self.settings.health_command,
                    "health command unavailable; completing without verification"
                );
                let msg = format!(
                    "updated to version {} (health check unavailable, not verified)",
                    tx.request.version
                );
                self.finish(tx, Stage::Completed, msg).await
            }
            HealthOutcome::Unhealthy(code) => {
                let reason = match code {
                    Some(code) => format!("health check failed (exit code {code})"),
                    None => "health check failed".to_string(),
                };
                self.roll_back(tx, reason).await
            }
        }
    }

    /// Compensating path: stop, restore, start, poll. Always ends in `Failed`.
    async fn roll_back(&self, mut tx: Transaction, reason: String) -> TransactionReport {
        warn!(stage = %tx.stage(), reason = %reason, "update failed; rolling back");
        self.enter(&mut tx, Stage::RollingBack, &format!("rolling back: {reason}"))
            .await;

        match self.target.stop().await {
            Ok(outcome) => info!(?outcome, "stopped target for rollback"),
            Err(err) => warn!(error = %format!("{err:#}"), "stop during rollback failed; continuing"),
        }

        let restored = match tx.backup.as_ref() {
            Some(backup) => self.backups.restore(self.fs, backup),
            None => Err(anyhow::anyhow!("no backup recorded for this transaction")),
        };
        if let Err(err) = restored {
            return self.restore_failed(tx, &reason, format!("{err:#}")).await;
        }

        if let Err(err) = start_and_wait(self.target, self.settings.start_poll).await {
            return self.restore_failed(tx, &reason, format!("{err:#}")).await;
        }

        info!("previous version restored and running");
        let msg = format!("{reason}; rolled back to previous version");
        self.finish(tx, Stage::Failed, msg).await
    }

    async fn restore_failed(
        &self,
        tx: Transaction,
        reason: &str,
        detail: String,
    ) -> TransactionReport {
        error!(
            reason = %reason,
            detail = %detail,
            live = %self.settings.live_executable().display(),
            backup = ?tx.backup.as_ref().map(|b| b.backup_path.display().to_string()),
            "ROLLBACK FAILED: previous version could not be restored; manual intervention required"
        );
        let msg = format!("failed to restore previous version: {detail} (after: {reason})");
        self.finish(tx, Stage::Failed, msg).await
    }

    /// Move to a non-terminal stage and report it as UPDATING.
    async fn enter(&self, tx: &mut Transaction, stage: Stage, message: &str) {
        self.transition(tx, stage);
        self.emit(tx, StatusEvent::new(UpdateStatus::Updating, message))
            .await;
    }

    /// Move to a terminal stage, tidy up staging and emit the terminal status.
    async fn finish(
        &self,
        mut tx: Transaction,
        stage: Stage,
        message: String,
    ) -> TransactionReport {
        self.transition(&mut tx, stage);

        if stage == Stage::Completed || tx.artifact_consumed {
            self.remove_staging(&self.settings.staging_dir);
        }

        let status = if stage == Stage::Completed {
            info!(message = %message, "update completed");
            UpdateStatus::Completed
        } else {
            error!(message = %message, "update failed");
            UpdateStatus::Failed
        };
        self.emit(&mut tx, StatusEvent::new(status, message)).await;
        tx.into_report()
    }

    fn transition(&self, tx: &mut Transaction, stage: Stage) {
        if let Err(err) = tx.advance(stage) {
            // Every call site follows the stage graph; reaching this is a bug.
            error!(error = %err, "stage graph violated");
            debug_assert!(false, "{err}");
        }
    }

    async fn emit(&self, tx: &mut Transaction, event: StatusEvent) {
        if !tx.trail_mut().push(event.clone()) {
            warn!(status = %event.status, "dropping status emitted after terminal status");
            return;
        }
        self.reporter.report(&tx.request.version, &event).await;
    }

    fn remove_staging(&self, dir: &Path) {
        if !self.fs.is_dir(dir) {
            return;
        }
        match self.fs.remove_dir_all(dir) {
            Ok(()) => info!(dir = %dir.display(), "removed staging directory"),
            Err(err) => warn!(dir = %dir.display(), error = %format!("{err:#}"), "failed to remove staging directory"),
        }
    }
}
