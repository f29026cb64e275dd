// src/logging.rs

//! Logging for `update-executor`.
//!
//! Level: `--log-level`, then `UPDATE_EXECUTOR_LOG`, then `info`. HTTP client
//! internals are capped at `warn`. Output goes to stderr, with the `update`
//! span (version, command id) prefixed to every transaction line so logs from
//! concurrent or repeated updates can be told apart.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV_VAR: &str = "UPDATE_EXECUTOR_LOG";

/// Crates that are far too chatty below `warn`.
const QUIET_CRATES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

/// Install the global subscriber. Call once, before the transaction starts.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO),
    };

    let filter = EnvFilter::try_new(filter_directives(level))
        .context("building log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("installing log subscriber: {err}"))?;

    Ok(())
}

/// `"<level>,hyper=warn,..."`; dependencies never log louder than ours.
fn filter_directives(level: Level) -> String {
    let dep_level = if level < Level::WARN { level } else { Level::WARN };
    let mut directives = level.as_str().to_lowercase();
    for krate in QUIET_CRATES {
        directives.push_str(&format!(",{krate}={}", dep_level.as_str().to_lowercase()));
    }
    directives
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
