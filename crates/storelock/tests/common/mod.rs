//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;

use storelock_core::lock::StoreLock;
use storelock_core::storage::{LockState, LockStorage};
use storelock_file::{FileLock, FileStorage, OsFileSystem};
use storelock_object::{MemoryObjectStore, ObjectLock, ObjectStorage};

pub const BUCKET: &str = "bucket";
pub const KMS_KEY: &str = "kmsKeyArn";

/// A lock on `name` inside `dir`, on the real file system.
pub fn os_lock(node: u16, dir: &Path, name: &str) -> FileLock<OsFileSystem> {
    let path = dir.join(name);
    StoreLock::new(node, path.to_string_lossy(), FileStorage::new(OsFileSystem))
}

/// A lock on `key` in the shared in-memory bucket.
pub fn object_lock(node: u16, store: &MemoryObjectStore, key: &str) -> ObjectLock<MemoryObjectStore> {
    StoreLock::new(node, key, ObjectStorage::new(store.clone(), BUCKET, KMS_KEY))
}

pub async fn assert_state<S: LockStorage>(lock: &StoreLock<S>, expected: LockState) {
    assert_eq!(lock.lock_state().await.unwrap(), expected, "state of {}", lock.lock_uri());
}
