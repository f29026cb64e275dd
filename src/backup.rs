// src/backup.rs

//! Snapshot and restore of the live executable.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::fs::FileSystem;

/// Timestamp format used in backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A retained copy of the live executable taken before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub source_path: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: DateTime<Local>,
}

/// Creates and restores backups under a single backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Copy `live` to `<backup_dir>/<name>_<YYYYMMDDHHMMSS>`.
    pub fn snapshot(&self, fs: &dyn FileSystem, live: &Path) -> Result<Backup> {
        self.snapshot_at(fs, live, Local::now())
    }

    pub fn snapshot_at(
        &self,
        fs: &dyn FileSystem,
        live: &Path,
        timestamp: DateTime<Local>,
    ) -> Result<Backup> {
        if !fs.is_file(live) {
            return Err(anyhow!("live executable {:?} is missing or not a file", live));
        }
        let name = live
            .file_name()
            .ok_or_else(|| anyhow!("live executable path {:?} has no file name", live))?
            .to_string_lossy();

        fs.create_dir_all(&self.backup_dir)
            .context("creating backup directory")?;

        let backup_path = self.backup_dir.join(format!(
            "{}_{}",
            name,
            timestamp.format(BACKUP_TIMESTAMP_FORMAT)
        ));
        fs.copy(live, &backup_path)
            .context("copying live executable to backup")?;

        info!(
            live = %live.display(),
            backup = %backup_path.display(),
            "backed up live executable"
        );

        Ok(Backup {
            source_path: live.to_path_buf(),
            backup_path,
            timestamp,
        })
    }

    /// Copy the backup over its source path and mark it executable.
    pub fn restore(&self, fs: &dyn FileSystem, backup: &Backup) -> Result<()> {
        if !fs.is_file(&backup.backup_path) {
            return Err(anyhow!(
                "backup {:?} vanished during the transaction",
                backup.backup_path
            ));
        }
        fs.replace_executable(&backup.backup_path, &backup.source_path)
            .context("restoring live executable from backup")?;

        info!(
            live = %backup.source_path.display(),
            backup = %backup.backup_path.display(),
            "restored live executable from backup"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::{MockFileSystem, MockOp};
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn snapshot_names_backup_with_timestamp() {
        let fs = MockFileSystem::new();
        fs.add_executable("/opt/c/device-client", b"v1".to_vec());
        let mgr = BackupManager::new("/opt/c/backup");

        let backup = mgr
            .snapshot_at(&fs, Path::new("/opt/c/device-client"), fixed_time())
            .unwrap();

        assert_eq!(
            backup.backup_path,
            PathBuf::from("/opt/c/backup/device-client_20240309140507")
        );
        assert_eq!(fs.contents(&backup.backup_path).unwrap(), b"v1");
    }

    #[test]
    fn snapshot_fails_when_backup_dir_cannot_be_created() {
        let fs = MockFileSystem::new();
        fs.add_executable("/opt/c/device-client", b"v1".to_vec());
        fs.fail_on(MockOp::CreateDir, "/opt/c/backup");
        let mgr = BackupManager::new("/opt/c/backup");

        let err = mgr
            .snapshot(&fs, Path::new("/opt/c/device-client"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("creating backup directory"));
    }

    #[test]
    fn restore_requires_backup_to_exist() {
        let fs = MockFileSystem::new();
        fs.add_executable("/opt/c/device-client", b"v1".to_vec());
        let mgr = BackupManager::new("/opt/c/backup");
        let backup = mgr
            .snapshot(&fs, Path::new("/opt/c/device-client"))
            .unwrap();

        fs.add_file("/opt/c/device-client", b"v2".to_vec());
        mgr.restore(&fs, &backup).unwrap();
        assert_eq!(fs.contents("/opt/c/device-client").unwrap(), b"v1");
        assert!(fs.is_executable("/opt/c/device-client"));

        fs.remove_file(&backup.backup_path);
        assert!(mgr.restore(&fs, &backup).is_err());
    }
}
