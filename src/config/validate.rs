// src/config/validate.rs

use std::path::Path;

use crate::config::model::{RawSettings, Settings};
use crate::errors::{Result, UpdateError};

impl TryFrom<RawSettings> for Settings {
    type Error = crate::errors::UpdateError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_settings(&raw)?;
        Ok(Settings::new_unchecked(raw))
    }
}

/// Check basic invariants of raw settings.
pub fn validate_settings(raw: &RawSettings) -> Result<()> {
    validate_install(raw)?;
    validate_names(raw)?;
    validate_poll(raw)?;
    Ok(())
}

fn validate_install(raw: &RawSettings) -> Result<()> {
    let exe = raw.install.executable.trim();
    if exe.is_empty() {
        return Err(UpdateError::ConfigError(
            "[install].executable must not be empty".to_string(),
        ));
    }
    if Path::new(exe).components().count() != 1 {
        return Err(UpdateError::ConfigError(format!(
            "[install].executable must be a bare file name (got '{}')",
            exe
        )));
    }
    if raw.install.staging_dir == raw.install.dir {
        return Err(UpdateError::ConfigError(
            "[install].staging_dir must differ from [install].dir".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(raw: &RawSettings) -> Result<()> {
    if raw.service.name.trim().is_empty() {
        return Err(UpdateError::ConfigError(
            "[service].name must not be empty".to_string(),
        ));
    }
    if raw.health.command.trim().is_empty() {
        return Err(UpdateError::ConfigError(
            "[health].command must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_poll(raw: &RawSettings) -> Result<()> {
    if raw.poll.start_attempts == 0 || raw.poll.stop_attempts == 0 {
        return Err(UpdateError::ConfigError(
            "[poll].start_attempts and [poll].stop_attempts must be >= 1".to_string(),
        ));
    }
    if raw.poll.interval_ms == 0 {
        return Err(UpdateError::ConfigError(
            "[poll].interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
