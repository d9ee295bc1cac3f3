//! File system backend for storage-backed locks.
//!
//! The lock record for `path` lives in the file `path + suffix`.

pub mod fs;
pub mod lock;
pub mod provider;

pub use fs::{FileStat, FileSystem, MemoryFileSystem, OsFileSystem};
pub use lock::{FileLock, FileStorage};
pub use provider::{FileLockProvider, FileLockProviderBuilder};
