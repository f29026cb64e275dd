// src/lib.rs

pub mod backup;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod health;
pub mod logging;
pub mod report;
pub mod staging;
pub mod target;
pub mod types;

use anyhow::Result;
use tracing::{info, info_span, warn, Instrument};

use crate::cli::CliArgs;
use crate::config::{resolve_device_config, resolve_settings, Settings};
use crate::engine::{Orchestrator, TransactionReport};
use crate::fs::{FileSystem, RealFileSystem};
use crate::health::CommandHealthVerifier;
use crate::report::{HttpStatusReporter, LogOnlyReporter, StatusReporter};
use crate::target::{resolve_target, RuntimeTarget};
use crate::types::UpdateRequest;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings resolution (once per transaction)
/// - runtime target selection (service vs. free process)
/// - status reporter (HTTP, or log-only without device config)
/// - health verifier
/// - the orchestrator
///
/// Returns whether the transaction completed successfully.
pub async fn run(args: CliArgs) -> Result<bool> {
    let settings = resolve_settings(args.settings.as_deref())?;
    let request = UpdateRequest::new(args.version, args.command_id);
    let fs = RealFileSystem;

    let target = resolve_target(&settings).await;

    if args.dry_run {
        print_dry_run(&settings, &fs, target.as_ref(), &request);
        return Ok(true);
    }

    let reporter = build_reporter(&settings, &fs);
    let health = CommandHealthVerifier::new(
        settings.health_command.clone(),
        settings.health_args.clone(),
        settings.health_timeout,
    );

    let span = info_span!(
        "update",
        version = %request.version,
        command_id = %request.command_id
    );
    let report = Orchestrator::new(&settings, &fs, target.as_ref(), &health, reporter.as_ref())
        .run(request)
        .instrument(span)
        .await;

    log_summary(&report);
    Ok(report.succeeded())
}

fn build_reporter(settings: &Settings, fs: &dyn FileSystem) -> Box<dyn StatusReporter> {
    let Some((path, device)) = resolve_device_config(fs, &settings.config_candidates) else {
        warn!(
            candidates = ?settings.config_candidates,
            "no usable device config; status will only be logged"
        );
        return Box::new(LogOnlyReporter);
    };

    match HttpStatusReporter::new(&device, settings.report_timeout) {
        Ok(reporter) => {
            info!(config = %path.display(), url = %reporter.url(), "reporting status to backend");
            Box::new(reporter)
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "cannot build HTTP reporter; status will only be logged");
            Box::new(LogOnlyReporter)
        }
    }
}

fn log_summary(report: &TransactionReport) {
    let stages: Vec<String> = report.stages.iter().map(|s| s.to_string()).collect();
    info!(
        final_stage = %report.final_stage,
        rolled_back = report.rolled_back(),
        stages = %stages.join(" -> "),
        backup = ?report.backup.as_ref().map(|b| b.backup_path.display().to_string()),
        "transaction finished"
    );
}

/// Simple dry-run output: print what a transaction would operate on.
fn print_dry_run(
    settings: &Settings,
    fs: &dyn FileSystem,
    target: &dyn RuntimeTarget,
    request: &UpdateRequest,
) {
    println!("update-executor dry-run");
    println!("  version    = {}", request.version);
    println!("  command_id = {}", request.command_id);
    println!("  target     = {} ({})", target.describe(), target.kind());
    println!("  live       = {}", settings.live_executable().display());
    match staging::locate_artifact(fs, &settings.staging_dir) {
        Ok(artifact) => println!("  artifact   = {}", artifact.path.display()),
        Err(err) => println!("  artifact   = <none: {err}>"),
    }
    println!("  backup_dir = {}", settings.backup_dir.display());
    if settings.health_args.is_empty() {
        println!("  health     = {}", settings.health_command);
    } else {
        println!(
            "  health     = {} {}",
            settings.health_command,
            settings.health_args.join(" ")
        );
    }
    println!(
        "  start poll = {} x {:?}",
        settings.start_poll.attempts, settings.start_poll.interval
    );
    println!(
        "  stop poll  = {} x {:?}",
        settings.stop_poll.attempts, settings.stop_poll.interval
    );
}
