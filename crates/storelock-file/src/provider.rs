//! File lock provider implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use storelock_core::error::{LockError, LockResult};
use storelock_core::identity::LockIdentity;
use storelock_core::lock::StoreLock;
use storelock_core::options::LockOptions;
use storelock_core::traits::LockProvider;

use crate::fs::{FileSystem, OsFileSystem};
use crate::lock::{FileLock, FileStorage};

/// Builder for file-based lock provider configuration.
pub struct FileLockProviderBuilder<F = OsFileSystem> {
    fs: F,
    node: Option<u16>,
    session: Option<u64>,
    directory: Option<PathBuf>,
    options: LockOptions,
}

impl FileLockProviderBuilder<OsFileSystem> {
    /// Creates a new builder over the operating system's file system.
    pub fn new() -> Self {
        Self {
            fs: OsFileSystem,
            node: None,
            session: None,
            directory: None,
            options: LockOptions::default(),
        }
    }
}

impl Default for FileLockProviderBuilder<OsFileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> FileLockProviderBuilder<F> {
    /// Uses another file system implementation.
    pub fn file_system<G: FileSystem>(self, fs: G) -> FileLockProviderBuilder<G> {
        FileLockProviderBuilder {
            fs,
            node: self.node,
            session: self.session,
            directory: self.directory,
            options: self.options,
        }
    }

    /// Sets the node id written into lock records. Required.
    pub fn node(mut self, node: u16) -> Self {
        self.node = Some(node);
        self
    }

    /// Reuses the session of an earlier instance instead of starting a new one.
    pub fn session(mut self, session: u64) -> Self {
        self.session = Some(session);
        self
    }

    /// Resolves relative lock names against this directory.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    /// Sets the suffix of lock files (default `.lock`).
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.options.suffix = suffix.into();
        self
    }

    /// Sets the lease after which a lock counts as abandoned; zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Builds the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if no node is specified or the suffix is empty.
    pub fn build(self) -> LockResult<FileLockProvider<F>> {
        let node = self
            .node
            .ok_or_else(|| LockError::Config("node not specified".to_string()))?;
        if self.options.suffix.is_empty() {
            return Err(LockError::Config(
                "lock suffix must not be empty".to_string(),
            ));
        }

        let identity = match self.session {
            Some(session) => LockIdentity::with_session(node, session),
            None => LockIdentity::new(node),
        };

        Ok(FileLockProvider {
            storage: Arc::new(FileStorage::new(self.fs)),
            identity,
            directory: self.directory,
            options: self.options,
        })
    }
}

/// Provider for file-based locks.
///
/// Every lock it creates shares one identity, so locks taken through the
/// same provider belong to the same node and session.
pub struct FileLockProvider<F = OsFileSystem> {
    storage: Arc<FileStorage<F>>,
    identity: LockIdentity,
    directory: Option<PathBuf>,
    options: LockOptions,
}

impl FileLockProvider<OsFileSystem> {
    /// Returns a new builder for configuring the provider.
    pub fn builder() -> FileLockProviderBuilder<OsFileSystem> {
        FileLockProviderBuilder::new()
    }

    /// Creates a provider for `node` with default options.
    ///
    /// Convenience method for simple use cases.
    pub fn new(node: u16) -> LockResult<Self> {
        Self::builder().node(node).build()
    }
}

impl<F: FileSystem> FileLockProvider<F> {
    pub fn identity(&self) -> LockIdentity {
        self.identity
    }

    /// Returns the directory relative names are resolved against, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Path of the protected file for a lock name.
    pub fn resolve(&self, name: &str) -> PathBuf {
        match &self.directory {
            Some(directory) => directory.join(name),
            None => PathBuf::from(name),
        }
    }
}

impl<F: FileSystem> LockProvider for FileLockProvider<F> {
    type Lock = FileLock<F>;

    fn create_lock(&self, name: &str) -> Self::Lock {
        let path = self.resolve(name);
        StoreLock::with_shared_storage(
            self.identity,
            path.to_string_lossy(),
            Arc::clone(&self.storage),
            self.options.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use storelock_core::traits::{DistributedLock, LockHandle};

    #[test]
    fn test_node_is_required() {
        let result = FileLockProvider::builder().build();
        assert!(matches!(result, Err(LockError::Config(_))));

        let result = FileLockProvider::builder().node(1).suffix("").build();
        assert!(matches!(result, Err(LockError::Config(_))));
    }

    #[test]
    fn test_directory_resolution() {
        let provider = FileLockProvider::builder()
            .node(1)
            .directory("/var/shared")
            .build()
            .unwrap();

        let lock = provider.create_lock("report.csv");
        assert_eq!(
            PathBuf::from(lock.resource()),
            Path::new("/var/shared").join("report.csv")
        );
        assert!(lock.lock_uri().ends_with("report.csv.lock"));
    }

    #[tokio::test]
    async fn test_locks_share_identity() {
        let fs = MemoryFileSystem::new();
        let provider = FileLockProvider::builder()
            .file_system(fs.clone())
            .node(4)
            .session(99)
            .suffix(".held")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let first = provider.create_lock("a.txt");
        let second = provider.create_lock("b.txt");
        assert_eq!(first.identity(), second.identity());
        assert_eq!(first.session(), 99);
        assert_eq!(first.timeout(), Duration::from_secs(5));

        let handle = first.acquire(None).await.unwrap();
        assert!(fs.contents("a.txt.held").is_some());
        handle.release().await.unwrap();
        assert!(fs.contents("a.txt.held").is_none());
    }
}
