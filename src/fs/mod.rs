// src/fs/mod.rs

//! Filesystem seam used by the backup manager, staging lookup and binary swap.
//!
//! Production code uses [`RealFileSystem`]; tests can use
//! [`mock::MockFileSystem`] to observe and fail individual operations.

use std::ffi::OsString;
use std::fmt::Debug;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Plain copy of `from` to a fresh path `to`.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Replace `to` with the contents of `from` and mark it executable.
    ///
    /// `to` is never truncated: the contents land in a sibling temporary file
    /// which is then renamed over `to`, so readers see either the old or the
    /// new file.
    fn replace_executable(&self, from: &Path, to: &Path) -> Result<()>;

    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Sibling path used while replacing `target`.
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("executable"));
    name.push(".partial");
    target.with_file_name(name)
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
        Ok(())
    }

    fn replace_executable(&self, from: &Path, to: &Path) -> Result<()> {
        let partial = partial_path(to);
        fs::copy(from, &partial)
            .with_context(|| format!("copying {:?} to {:?}", from, partial))?;
        if let Err(err) = set_executable(&partial) {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
        if let Err(err) = fs::rename(&partial, to) {
            let _ = fs::remove_file(&partial);
            return Err(err).with_context(|| format!("renaming {:?} to {:?}", partial, to));
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_context(|| format!("removing dir {:?}", path))
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)
        .with_context(|| format!("reading metadata of {:?}", path))?
        .permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod +x {:?}", path))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_path_is_a_sibling() {
        let p = partial_path(Path::new("/opt/client/device-client"));
        assert_eq!(p, PathBuf::from("/opt/client/device-client.partial"));
    }

    #[cfg(unix)]
    #[test]
    fn replace_executable_swaps_contents_and_sets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("client");
        let staged = dir.path().join("client-new");
        fs::write(&live, b"old").unwrap();
        fs::write(&staged, b"new").unwrap();

        RealFileSystem.replace_executable(&staged, &live).unwrap();

        assert_eq!(fs::read(&live).unwrap(), b"new");
        let mode = fs::metadata(&live).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        assert!(!partial_path(&live).exists());
    }

    #[test]
    fn replace_executable_with_missing_source_leaves_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("client");
        fs::write(&live, b"old").unwrap();

        let err = RealFileSystem
            .replace_executable(&dir.path().join("nope"), &live)
            .unwrap_err();
        assert!(format!("{err:#}").contains("copying"));
        assert_eq!(fs::read(&live).unwrap(), b"old");
    }
}
