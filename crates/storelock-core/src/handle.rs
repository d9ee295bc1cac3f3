//! Handle returned by a successful acquisition.

use tracing::instrument;

use crate::error::LockResult;
use crate::lock::StoreLock;
use crate::storage::LockStorage;
use crate::traits::LockHandle;

/// Handle for a held lock.
///
/// Dropping the handle does not remove the record: release needs the
/// medium, so call [`release`](LockHandle::release). A record that is
/// never released is reclaimed by the next session of the same node or
/// once its lease expires.
pub struct StoreLockHandle<S> {
    lock: StoreLock<S>,
}

impl<S: LockStorage> StoreLockHandle<S> {
    pub(crate) fn new(lock: StoreLock<S>) -> Self {
        Self { lock }
    }

    /// The lock this handle holds.
    pub fn lock(&self) -> &StoreLock<S> {
        &self.lock
    }
}

impl<S: LockStorage> LockHandle for StoreLockHandle<S> {
    #[instrument(skip(self), fields(lock.uri = %self.lock.lock_uri(), backend = S::BACKEND))]
    async fn release(self) -> LockResult<()> {
        self.lock.unlock().await
    }
}
