//! File-backed lock storage.

use std::io::ErrorKind;
use std::path::Path;

use storelock_core::error::{LockError, LockResult};
use storelock_core::lock::StoreLock;
use storelock_core::storage::{LockState, LockStorage};
use tracing::trace;

use crate::fs::{FileSystem, OsFileSystem};

/// A lock whose record is a file next to the protected file.
///
/// If the protected path is `/data/file.txt` the record is written to
/// `/data/file.txt.lock`.
///
/// ```rust,ignore
/// let lock = FileLock::new(0, "/data/file.txt", FileStorage::new(OsFileSystem));
/// lock.lock().await?;
/// ```
pub type FileLock<F = OsFileSystem> = StoreLock<FileStorage<F>>;

/// Stores lock records as files.
#[derive(Debug, Clone, Default)]
pub struct FileStorage<F = OsFileSystem> {
    fs: F,
}

impl<F: FileSystem> FileStorage<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// The underlying file system.
    pub fn file_system(&self) -> &F {
        &self.fs
    }
}

impl<F: FileSystem> LockStorage for FileStorage<F> {
    const BACKEND: &'static str = "file";

    async fn exists(&self, resource: &str) -> LockResult<LockState> {
        match self.fs.stat(Path::new(resource)).await {
            Ok(stat) => {
                trace!(path = resource, len = stat.len, "lock file present");
                Ok(LockState::Locked)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LockState::Unlocked),
            Err(e) => Err(LockError::backing_store("stat", resource, e)),
        }
    }

    async fn read(&self, resource: &str) -> LockResult<Vec<u8>> {
        self.fs
            .read(Path::new(resource))
            .await
            .map_err(|e| LockError::backing_store("read", resource, e))
    }

    async fn write(&self, resource: &str, body: Vec<u8>) -> LockResult<()> {
        self.fs
            .write(Path::new(resource), &body)
            .await
            .map_err(|e| LockError::backing_store("write", resource, e))
    }

    async fn remove(&self, resource: &str) -> LockResult<()> {
        self.fs
            .remove(Path::new(resource))
            .await
            .map_err(|e| LockError::backing_store("remove", resource, e))
    }

    fn uri(&self, resource: &str) -> String {
        resource.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::io;
    use std::time::Duration;
    use storelock_core::record::LockRecord;
    use storelock_core::traits::{DistributedLock, LockHandle};
    use storelock_core::{DEFAULT_SUFFIX, DEFAULT_TIMEOUT};

    fn file_lock(node: u16, fs: &MemoryFileSystem) -> FileLock<MemoryFileSystem> {
        FileLock::<MemoryFileSystem>::new(node, "file.txt", FileStorage::new(fs.clone()))
    }

    #[tokio::test]
    async fn test_file_lock() {
        let fs = MemoryFileSystem::new();
        let l = file_lock(0, &fs);

        l.lock().await.unwrap();

        let data = fs.contents("file.txt.lock").unwrap();
        let record = LockRecord::decode(&data).unwrap();
        assert_eq!(record.node, 0);
        assert_eq!(record.session, l.session());
        assert_eq!(&data[..11], &l.lock_body()[..11]);

        l.unlock().await.unwrap();
        assert!(fs.contents("file.txt.lock").is_none());
        assert_eq!(l.lock_state().await.unwrap(), LockState::Unlocked);
    }

    #[tokio::test]
    async fn test_accessors() {
        let fs = MemoryFileSystem::new();
        let mut l = file_lock(0, &fs);

        assert_eq!(l.resource(), "file.txt");
        assert_eq!(l.resource_uri(), "file.txt");
        assert_eq!(l.lock_uri(), "file.txt.lock");
        assert_eq!(l.suffix(), DEFAULT_SUFFIX);
        assert_eq!(l.timeout(), DEFAULT_TIMEOUT);

        l.set_suffix(".newlock");
        assert_eq!(l.lock_uri(), "file.txt.newlock");
    }

    #[tokio::test]
    async fn test_lock_over_legacy_record_fails() {
        let fs = MemoryFileSystem::new();
        fs.insert("file.txt.lock", "0b5b0a4e-5e0b-4bb5-8f32-5d4f1e9c2d11");

        let l = file_lock(0, &fs);
        assert!(matches!(l.lock().await, Err(LockError::Format(_))));
        assert!(matches!(l.unlock().await, Err(LockError::Format(_))));
    }

    /// File system whose stat fails with something other than "not found".
    #[derive(Clone)]
    struct DeniedFileSystem;

    impl FileSystem for DeniedFileSystem {
        async fn stat(&self, _path: &Path) -> io::Result<crate::fs::FileStat> {
            Err(io::Error::new(ErrorKind::PermissionDenied, "denied"))
        }

        async fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            Err(io::Error::new(ErrorKind::PermissionDenied, "denied"))
        }

        async fn write(&self, _path: &Path, _data: &[u8]) -> io::Result<()> {
            Err(io::Error::new(ErrorKind::PermissionDenied, "denied"))
        }

        async fn remove(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[tokio::test]
    async fn test_stat_failure_is_not_unlocked() {
        let l = FileLock::<DeniedFileSystem>::new(0, "file.txt", FileStorage::new(DeniedFileSystem));

        let err = l.lock_state().await.unwrap_err();
        assert!(matches!(err, LockError::BackingStore { operation: "stat", .. }));
        assert_eq!(l.current_state().await, LockState::Unknown);
        assert!(matches!(l.lock().await, Err(LockError::BackingStore { .. })));
    }

    /// File system whose writes finish on a background task after a delay,
    /// as a blocking-pool write does.
    #[derive(Clone)]
    struct SlowWriteFileSystem {
        inner: MemoryFileSystem,
        delay: Duration,
    }

    impl FileSystem for SlowWriteFileSystem {
        async fn stat(&self, path: &Path) -> io::Result<crate::fs::FileStat> {
            self.inner.stat(path).await
        }

        async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.inner.read(path).await
        }

        async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
            let inner = self.inner.clone();
            let delay = self.delay;
            let path = path.to_path_buf();
            let data = data.to_vec();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner.write(&path, &data).await
            })
            .await
            .map_err(io::Error::other)?
        }

        async fn remove(&self, path: &Path) -> io::Result<()> {
            self.inner.remove(path).await
        }
    }

    #[tokio::test]
    async fn test_acquire_with_slow_write_keeps_its_handle() {
        let fs = MemoryFileSystem::new();
        let slow = SlowWriteFileSystem {
            inner: fs.clone(),
            delay: Duration::from_millis(50),
        };
        let l = FileLock::<SlowWriteFileSystem>::new(0, "a.txt", FileStorage::new(slow));

        let handle = l.acquire(Some(Duration::from_millis(20))).await.unwrap();
        assert!(fs.contents("a.txt.lock").is_some());

        handle.release().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fs.contents("a.txt.lock").is_none());
        assert!(FileLock::<MemoryFileSystem>::new(1, "a.txt", FileStorage::new(fs.clone()))
            .lock()
            .await
            .is_ok());
    }
}
