//! Distributed mutual-exclusion locks over shared storage.
//!
//! Independent processes ("nodes") serialize access to a resource by
//! writing an ownership record next to it on a medium they all see: a
//! local or networked file system, or an object store. There is no
//! coordinator; correctness is bounded by the read-after-write
//! consistency of the medium.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use storelock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Node ids are assigned by the deployment and survive restarts
//!     let provider = FileLockProvider::builder().node(3).build()?;
//!
//!     let lock = provider.create_lock("/shared/report.csv");
//!
//!     // Wait for the resource, then take it
//!     lock.wait_for_lock(Some(Duration::from_secs(30))).await?;
//!     lock.lock().await?;
//!
//!     // Critical section - we have exclusive access
//!     println!("Doing critical work...");
//!
//!     lock.unlock().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Ownership
//!
//! A record holds the writer's node, session and creation time. A node may
//! replace a record left by an earlier session of itself (a crashed or
//! restarted instance), and anyone may replace a record older than the
//! lock timeout. Everything else fails with `LockError::AlreadyLocked`.
//!
//! # Backends
//!
//! ## File System Backend
//!
//! ```rust,no_run
//! use storelock::FileLockProvider;
//!
//! let provider = FileLockProvider::builder()
//!     .node(1)
//!     .directory("/mnt/shared")
//!     .build()?;
//! # Ok::<(), storelock::LockError>(())
//! ```
//!
//! ## Object Storage Backend
//!
//! Any client implementing [`ObjectStoreClient`] can be used.
//!
//! ```rust,no_run
//! use storelock::{MemoryObjectStore, ObjectLockProvider};
//!
//! let provider = ObjectLockProvider::builder(MemoryObjectStore::new())
//!     .bucket("my-bucket")
//!     .kms_key_id("arn:aws:kms:us-west-2:111122223333:key/example")
//!     .node(1)
//!     .build()?;
//! # Ok::<(), storelock::LockError>(())
//! ```
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `storelock-core`: lock engine, record codec, traits
//! - `storelock-file`: file system backend
//! - `storelock-object`: object storage backend

// Re-export core types and traits
pub use storelock_core::*;

// Re-export file backend
#[allow(ambiguous_glob_reexports)]
pub use storelock_file::*;

// Re-export object storage backend
#[allow(ambiguous_glob_reexports)]
pub use storelock_object::*;
