//! Core engine, record codec and traits for storage-backed locks.
//!
//! The lock protocol lives here once, written against the [`LockStorage`]
//! capability. Backends only implement that capability.

pub mod error;
pub mod handle;
pub mod identity;
pub mod lock;
pub mod options;
pub mod prelude;
pub mod record;
pub mod storage;
pub mod timeout;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use error::{LockError, LockResult};
pub use handle::StoreLockHandle;
pub use options::{DEFAULT_SUFFIX, DEFAULT_TIMEOUT, LockOptions};
pub use prelude::*;
pub use record::LockRecord;
