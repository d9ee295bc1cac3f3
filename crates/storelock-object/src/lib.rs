//! Object storage backend for storage-backed locks.
//!
//! The lock record for `bucket/key` is the object `bucket/key + suffix`,
//! written with a private ACL and KMS server-side encryption.

pub mod client;
pub mod content_type;
pub mod lock;
pub mod memory;
pub mod provider;

pub use client::{
    ObjectAcl, ObjectMeta, ObjectStoreClient, ObjectStoreError, PutObjectRequest,
    ServerSideEncryption,
};
pub use lock::{DEFAULT_SCHEME, ObjectLock, ObjectStorage};
pub use memory::MemoryObjectStore;
pub use provider::{ObjectLockProvider, ObjectLockProviderBuilder};
