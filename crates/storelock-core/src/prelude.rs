//! Convenience prelude for lock types.

pub use crate::error::{LockError, LockResult};
pub use crate::identity::LockIdentity;
pub use crate::lock::StoreLock;
pub use crate::storage::{LockState, LockStorage};
pub use crate::traits::{DistributedLock, LockHandle, LockProvider, LockProviderExt};
