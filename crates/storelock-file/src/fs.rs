//! File system capability used by the file backend.

use std::collections::HashMap;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Metadata returned by [`FileSystem::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
}

/// The operations the file backend needs from a file system.
pub trait FileSystem: Send + Sync {
    /// Returns metadata, or an `ErrorKind::NotFound` error if the file is absent.
    fn stat(&self, path: &Path) -> impl Future<Output = io::Result<FileStat>> + Send;

    /// Reads the whole file.
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send;

    /// Creates or truncates the file and writes `data`.
    fn write(&self, path: &Path, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Deletes the file.
    fn remove(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;
}

/// The operating system's file system, through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            len: metadata.len(),
        })
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, data).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// A file system held in memory.
///
/// Clones share the same files, so several locks in one process can
/// contend on it like separate processes on a shared disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the file contents, if present.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files().get(path.as_ref()).cloned()
    }

    /// Writes a file directly, bypassing any lock.
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.files().insert(path.into(), data.into());
    }

    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        ErrorKind::NotFound,
        format!("{}: file does not exist", path.display()),
    )
}

impl FileSystem for MemoryFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.files()
            .get(path)
            .map(|data| FileStat {
                len: data.len() as u64,
            })
            .ok_or_else(|| not_found(path))
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.contents(path).ok_or_else(|| not_found(path))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.insert(path, data);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        self.files()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}
