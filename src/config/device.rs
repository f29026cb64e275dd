// src/config/device.rs

//! Device configuration (API key + backend URL) used only for status reporting.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// Credentials and endpoint of the backend, as stored by the client daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub api_key: String,
    pub server_url: String,
}

impl DeviceConfig {
    pub fn parse(raw: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Probe `candidates` in order; the first existing file wins.
///
/// A winning file that cannot be read or parsed yields `None` rather than
/// falling through to later candidates. Never fails: reporting is optional.
pub fn resolve_device_config(
    fs: &dyn FileSystem,
    candidates: &[PathBuf],
) -> Option<(PathBuf, DeviceConfig)> {
    let path = candidates.iter().find(|p| fs.is_file(p))?;
    match read_device_config(fs, path) {
        Ok(cfg) => {
            debug!(path = %path.display(), server = %cfg.server_url, "using device config");
            Some((path.clone(), cfg))
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable device config");
            None
        }
    }
}

fn read_device_config(fs: &dyn FileSystem, path: &Path) -> anyhow::Result<DeviceConfig> {
    let raw = fs.read_to_string(path)?;
    let cfg = DeviceConfig::parse(&raw)?;
    if cfg.api_key.trim().is_empty() || cfg.server_url.trim().is_empty() {
        anyhow::bail!("apiKey and serverUrl must be non-empty");
    }
    Ok(cfg)
}
