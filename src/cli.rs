// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `update-executor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "update-executor",
    version,
    about = "Install a staged client binary, restart it, and roll back if it is unhealthy.",
    long_about = None
)]
pub struct CliArgs {
    /// Version being installed (reported to the backend).
    #[arg(id = "target_version", value_name = "VERSION", value_parser = parse_version)]
    pub version: String,

    /// Command id of the update request. A random id is generated if omitted.
    #[arg(value_name = "COMMAND_ID")]
    pub command_id: Option<String>,

    /// Path to the executor settings file (TOML).
    ///
    /// Default: `/etc/update-executor/executor.toml` if it exists, otherwise
    /// built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `UPDATE_EXECUTOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve settings, runtime target and staged artifact, print the plan,
    /// but don't touch anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_version(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("version must not be empty".to_string());
    }
    Ok(trimmed.to_string())
}

/// Parse the process arguments.
///
/// `--help` and `--version` print and exit 0; usage errors print and exit 1.
pub fn parse() -> CliArgs {
    match CliArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            std::process::exit(exit_code(&err));
        }
    }
}

/// Exit code for a parse failure: 0 for informational output, 1 otherwise.
pub fn exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() { 1 } else { 0 }
}
