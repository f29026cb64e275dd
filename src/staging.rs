// src/staging.rs

//! Staged artifact lookup.

use std::path::{Path, PathBuf};

use crate::errors::{Result, UpdateError};
use crate::fs::FileSystem;

/// The new executable, already placed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub path: PathBuf,
}

/// Find the staged artifact in `staging_dir`.
///
/// The directory must contain exactly one regular file. Subdirectories are
/// ignored. A missing directory, no file, or more than one file is a
/// precondition failure.
pub fn locate_artifact(fs: &dyn FileSystem, staging_dir: &Path) -> Result<StagedArtifact> {
    if !fs.is_dir(staging_dir) {
        return Err(UpdateError::Precondition(format!(
            "staging directory {} does not exist",
            staging_dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs
        .read_dir(staging_dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .collect();
    files.sort();

    match files.len() {
        0 => Err(UpdateError::Precondition(format!(
            "no staged artifact in {}",
            staging_dir.display()
        ))),
        1 => Ok(StagedArtifact {
            path: files.remove(0),
        }),
        n => Err(UpdateError::Precondition(format!(
            "expected exactly one staged artifact in {}, found {}: {}",
            staging_dir.display(),
            n,
            files
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
