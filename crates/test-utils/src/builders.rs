#![allow(dead_code)]

use std::path::{Path, PathBuf};

use update_executor::config::{RawSettings, Settings};
use update_executor::fs::mock::MockFileSystem;

/// Builder for `Settings` with test-friendly timings (1 ms polls, no settle).
pub struct SettingsBuilder {
    raw: RawSettings,
}

impl SettingsBuilder {
    pub fn new(install_dir: impl AsRef<Path>) -> Self {
        let dir = install_dir.as_ref().to_path_buf();
        let mut raw = RawSettings::default();
        raw.install.staging_dir = dir.join("staging");
        raw.install.dir = dir;
        raw.install.executable = "device-client".to_string();
        raw.health.settle_secs = 0;
        raw.poll.interval_ms = 1;
        raw.report.config_candidates = Vec::new();
        Self { raw }
    }

    pub fn executable(mut self, name: &str) -> Self {
        self.raw.install.executable = name.to_string();
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw.install.staging_dir = dir.into();
        self
    }

    pub fn start_attempts(mut self, n: u32) -> Self {
        self.raw.poll.start_attempts = n;
        self
    }

    pub fn stop_attempts(mut self, n: u32) -> Self {
        self.raw.poll.stop_attempts = n;
        self
    }

    pub fn health_command(mut self, cmd: &str, args: &[&str]) -> Self {
        self.raw.health.command = cmd.to_string();
        self.raw.health.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }
}

/// An in-memory install layout: live executable + staging dir.
pub struct InstallFixture {
    pub fs: MockFileSystem,
    pub settings: Settings,
}

impl InstallFixture {
    /// `/opt/device-client` with the live binary `device-client` = `live`.
    pub fn new(live: &[u8]) -> Self {
        Self::with_settings(SettingsBuilder::new("/opt/device-client").build(), live)
    }

    pub fn with_settings(settings: Settings, live: &[u8]) -> Self {
        let fs = MockFileSystem::new();
        fs.add_executable(settings.live_executable(), live.to_vec());
        Self { fs, settings }
    }

    pub fn stage(self, name: &str, contents: &[u8]) -> Self {
        self.fs
            .add_file(self.settings.staging_dir.join(name), contents.to_vec());
        self
    }

    pub fn live_path(&self) -> PathBuf {
        self.settings.live_executable()
    }

    pub fn live_contents(&self) -> Vec<u8> {
        self.fs
            .contents(self.live_path())
            .expect("live executable missing")
    }

    /// Files currently in the backup directory.
    pub fn backups(&self) -> Vec<PathBuf> {
        self.fs
            .file_paths()
            .into_iter()
            .filter(|p| p.starts_with(&self.settings.backup_dir))
            .collect()
    }
}
