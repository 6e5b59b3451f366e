// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct MockFile {
    content: Vec<u8>,
    modified: SystemTime,
    executable: bool,
}

/// In-memory filesystem for exercising the poller without real markers.
///
/// Clones share the same storage, so a test can keep one handle to create
/// markers while the poller reads through another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockFile>>>,
    reads: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.add_file_at(path, content, SystemTime::now());
    }

    /// Add a file with an explicit modification time.
    pub fn add_file_at(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        let mut files = lock(&self.files);
        files.insert(
            path.as_ref().to_path_buf(),
            MockFile {
                content: content.into(),
                modified,
                executable: false,
            },
        );
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        lock(&self.files).remove(path.as_ref());
    }

    /// Contents of a file as UTF-8, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let files = lock(&self.files);
        files
            .get(path.as_ref())
            .map(|f| String::from_utf8_lossy(&f.content).into_owned())
    }

    pub fn is_executable(&self, path: impl AsRef<Path>) -> bool {
        let files = lock(&self.files);
        files.get(path.as_ref()).map(|f| f.executable).unwrap_or(false)
    }

    /// How many times a file's content was read (`read_to_string` / `open_read`).
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        let reads = lock(&self.reads);
        reads.get(path.as_ref()).copied().unwrap_or(0)
    }

    fn record_read(&self, path: &Path) {
        let mut reads = lock(&self.reads);
        *reads.entry(path.to_path_buf()).or_insert(0) += 1;
    }

    fn with_file<T>(&self, path: &Path, f: impl FnOnce(&MockFile) -> T) -> Result<T> {
        let files = lock(&self.files);
        files
            .get(path)
            .map(f)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.record_read(path);
        let content = self.with_file(path, |f| f.content.clone())?;
        String::from_utf8(content).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        self.record_read(path);
        let content = self.with_file(path, |f| f.content.clone())?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = lock(&self.files);
        files.contains_key(path)
    }

    fn len(&self, path: &Path) -> Result<u64> {
        self.with_file(path, |f| f.content.len() as u64)
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        self.with_file(path, |f| f.modified)
    }

    fn make_executable(&self, path: &Path) -> Result<()> {
        let mut files = lock(&self.files);
        match files.get_mut(path) {
            Some(f) => {
                f.executable = true;
                Ok(())
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}
