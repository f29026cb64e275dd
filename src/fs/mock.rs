// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { contents: Vec<u8>, executable: bool },
    Dir(Vec<String>), // List of child names
}

/// Operations that can be made to fail on a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Read,
    Copy,
    Replace,
    CreateDir,
    RemoveDir,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockEntry>,
    failures: HashSet<(MockOp, PathBuf)>,
    one_shot: HashSet<(MockOp, PathBuf)>,
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut state = MockState::default();
        // Ensure root exists
        state.files.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert_file(path.as_ref(), content.into(), false);
    }

    pub fn add_executable(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert_file(path.as_ref(), content.into(), true);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        ensure_dir_entry(&mut state.files, path.as_ref());
    }

    /// Make every subsequent `op` touching `path` fail.
    pub fn fail_on(&self, op: MockOp, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.failures.insert((op, path.as_ref().to_path_buf()));
    }

    /// Make only the next `op` touching `path` fail.
    pub fn fail_once(&self, op: MockOp, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.one_shot.insert((op, path.as_ref().to_path_buf()));
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failures.clear();
        state.one_shot.clear();
    }

    /// Delete a single file (test helper).
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state.lock().unwrap();
        state.files.remove(path);
        detach_from_parent(&mut state.files, path);
    }

    /// Contents of a file, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.files.get(path.as_ref()) {
            Some(MockEntry::File { contents, .. }) => Some(contents.clone()),
            _ => None,
        }
    }

    pub fn is_executable(&self, path: impl AsRef<Path>) -> bool {
        let state = self.state.lock().unwrap();
        matches!(
            state.files.get(path.as_ref()),
            Some(MockEntry::File { executable: true, .. })
        )
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        let state = self.state.lock().unwrap();
        let mut paths: Vec<PathBuf> = state
            .files
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File { .. }))
            .map(|(p, _)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    fn insert_file(&self, path: &Path, contents: Vec<u8>, executable: bool) {
        let mut state = self.state.lock().unwrap();
        insert_file_locked(&mut state.files, path, contents, executable);
    }

    fn check(state: &mut MockState, op: MockOp, path: &Path) -> Result<()> {
        let key = (op, path.to_path_buf());
        if state.one_shot.remove(&key) || state.failures.contains(&key) {
            return Err(anyhow!("injected {:?} failure on {:?}", op, path));
        }
        Ok(())
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    path.parent().map(|p| {
        if p.as_os_str().is_empty() {
            Path::new("/")
        } else {
            p
        }
    })
}

fn insert_file_locked(
    files: &mut HashMap<PathBuf, MockEntry>,
    path: &Path,
    contents: Vec<u8>,
    executable: bool,
) {
    files.insert(
        path.to_path_buf(),
        MockEntry::File {
            contents,
            executable,
        },
    );
    attach_to_parent(files, path);
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if files.contains_key(path) {
        return;
    }
    files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if parent_of(path).is_some_and(|parent| parent != path) {
        attach_to_parent(files, path);
    }
}

fn attach_to_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    ensure_dir_entry(files, parent);
    if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

fn detach_from_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            children.retain(|c| c != name);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, MockOp::Read, path)?;
        match state.files.get(path) {
            Some(MockEntry::File { contents, .. }) => String::from_utf8(contents.clone())
                .map_err(|e| anyhow!("Invalid UTF-8: {}", e)),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.files.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.files.get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        match state.files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, MockOp::CreateDir, path)?;
        if let Some(MockEntry::File { .. }) = state.files.get(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        ensure_dir_entry(&mut state.files, path);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, MockOp::Copy, from)?;
        Self::check(&mut state, MockOp::Copy, to)?;
        let (contents, executable) = match state.files.get(from) {
            Some(MockEntry::File {
                contents,
                executable,
            }) => (contents.clone(), *executable),
            _ => return Err(anyhow!("File not found: {:?}", from)),
        };
        insert_file_locked(&mut state.files, to, contents, executable);
        Ok(())
    }

    fn replace_executable(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, MockOp::Replace, to)?;
        let contents = match state.files.get(from) {
            Some(MockEntry::File { contents, .. }) => contents.clone(),
            _ => return Err(anyhow!("File not found: {:?}", from)),
        };
        insert_file_locked(&mut state.files, to, contents, true);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::check(&mut state, MockOp::RemoveDir, path)?;
        if !matches!(state.files.get(path), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        state.files.retain(|p, _| !p.starts_with(path));
        detach_from_parent(&mut state.files, path);
        Ok(())
    }
}
