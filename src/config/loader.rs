// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawSettings, Settings};
use crate::errors::Result;

/// Location probed when `--settings` is not given.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/update-executor/executor.toml";

/// Load a settings file from a given path and return the raw `RawSettings`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for the
/// checked [`Settings`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettings> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let settings: RawSettings = toml::from_str(&contents)?;

    Ok(settings)
}

/// Load a settings file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Settings> {
    let raw = load_from_path(&path)?;
    let settings = Settings::try_from(raw)?;
    Ok(settings)
}

/// Resolve the settings for one transaction.
///
/// - An explicit path must exist and parse.
/// - Otherwise [`DEFAULT_SETTINGS_PATH`] is used if present.
/// - Otherwise built-in defaults apply.
pub fn resolve_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading settings from explicit path");
        return load_and_validate(path);
    }

    let default_path = default_settings_path();
    if default_path.is_file() {
        debug!(path = %default_path.display(), "loading settings from default path");
        return load_and_validate(&default_path);
    }

    debug!("no settings file found; using built-in defaults");
    Settings::try_from(RawSettings::default())
}

pub fn default_settings_path() -> PathBuf {
    PathBuf::from(DEFAULT_SETTINGS_PATH)
}
