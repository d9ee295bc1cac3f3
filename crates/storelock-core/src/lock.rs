//! Backend-agnostic lock engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{Span, debug, field, instrument, warn};

use crate::error::{LockError, LockResult};
use crate::handle::StoreLockHandle;
use crate::identity::LockIdentity;
use crate::options::LockOptions;
use crate::record::{LockRecord, now_nanos};
use crate::storage::{LockState, LockStorage};
use crate::timeout::TimeoutValue;
use crate::traits::DistributedLock;

/// Base delay between two state probes while waiting.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound (exclusive) of the random jitter added to each poll, in ms.
const POLL_JITTER_MILLIS: u64 = 100;

/// A lock on one resource, stored on one medium.
///
/// The record lives at `resource + suffix`. Clones share the storage and
/// the internal guard, so they behave as the same handle.
pub struct StoreLock<S> {
    identity: LockIdentity,
    resource: String,
    options: LockOptions,
    storage: Arc<S>,
    /// Serializes state-mutating operations issued through this handle.
    guard: Arc<Mutex<()>>,
}

/// How the current record relates to this handle.
#[derive(Debug, Clone, Copy)]
struct Ownership {
    node_owned: bool,
    session_owned: bool,
    expired: bool,
}

impl Ownership {
    /// Left behind by a crashed or restarted instance of this node, or past
    /// its lease.
    fn is_abandoned(&self) -> bool {
        (self.node_owned && !self.session_owned) || self.expired
    }
}

impl<S> Clone for StoreLock<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity,
            resource: self.resource.clone(),
            options: self.options.clone(),
            storage: Arc::clone(&self.storage),
            guard: Arc::clone(&self.guard),
        }
    }
}

impl<S: LockStorage> StoreLock<S> {
    /// Creates a lock for `resource` as `node`, with a fresh session and
    /// default options.
    pub fn new(node: u16, resource: impl Into<String>, storage: S) -> Self {
        Self::with_options(
            LockIdentity::new(node),
            resource,
            storage,
            LockOptions::default(),
        )
    }

    pub fn with_options(
        identity: LockIdentity,
        resource: impl Into<String>,
        storage: S,
        options: LockOptions,
    ) -> Self {
        Self::with_shared_storage(identity, resource, Arc::new(storage), options)
    }

    /// Creates a lock over storage shared with other locks.
    pub fn with_shared_storage(
        identity: LockIdentity,
        resource: impl Into<String>,
        storage: Arc<S>,
        options: LockOptions,
    ) -> Self {
        Self {
            identity,
            resource: resource.into(),
            options,
            storage,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Acquires the lock, repairing abandoned records.
    ///
    /// # Errors
    ///
    /// * `LockError::AlreadyLocked` - a live record of another owner exists
    /// * `LockError::Format` - the existing record is malformed
    /// * `LockError::BackingStore` - the medium failed
    #[instrument(skip(self), fields(lock.uri = %self.lock_uri(), node = self.node(), backend = S::BACKEND, repaired = field::Empty))]
    pub async fn lock(&self) -> LockResult<()> {
        let lock_resource = self.lock_resource();

        if self.lock_state().await? == LockState::Locked {
            let ownership = self.ownership().await?;
            if !ownership.is_abandoned() {
                return Err(LockError::AlreadyLocked(self.resource_uri()));
            }

            debug!(?ownership, "removing abandoned lock record");
            let _guard = self.guard.lock().await;
            self.storage.remove(&lock_resource).await?;
            Span::current().record("repaired", true);
        }

        let _guard = self.guard.lock().await;
        self.storage.write(&lock_resource, self.lock_body()).await?;
        debug!("lock record written");
        Ok(())
    }

    /// Releases a lock held by this node, or one whose lease expired.
    ///
    /// The session is not checked, so a restarted instance of the owning
    /// node can release what its predecessor left behind.
    #[instrument(skip(self), fields(lock.uri = %self.lock_uri(), node = self.node(), backend = S::BACKEND))]
    pub async fn unlock(&self) -> LockResult<()> {
        if self.lock_state().await? == LockState::Unlocked {
            return Err(LockError::NotLocked(self.resource_uri()));
        }

        let ownership = self.ownership().await?;
        if !ownership.node_owned && !ownership.expired {
            return Err(LockError::NotOwned(self.resource_uri()));
        }

        let _guard = self.guard.lock().await;
        self.storage.remove(&self.lock_resource()).await?;
        debug!("lock record removed");
        Ok(())
    }

    /// Removes the lock record regardless of who owns it.
    #[instrument(skip(self), fields(lock.uri = %self.lock_uri(), node = self.node(), backend = S::BACKEND))]
    pub async fn force_unlock(&self) -> LockResult<()> {
        if self.lock_state().await? == LockState::Unlocked {
            return Err(LockError::NotLocked(self.resource_uri()));
        }

        let _guard = self.guard.lock().await;
        self.storage.remove(&self.lock_resource()).await?;
        warn!("lock record forcibly removed");
        Ok(())
    }

    /// Queries the medium for the lock state.
    ///
    /// A failure other than absence is returned as an error; see
    /// [`current_state`](Self::current_state) for a probe that never fails.
    pub async fn lock_state(&self) -> LockResult<LockState> {
        let _guard = self.guard.lock().await;
        self.storage.exists(&self.lock_resource()).await
    }

    /// Queries the lock state, reporting medium failures as `Unknown`.
    pub async fn current_state(&self) -> LockState {
        match self.lock_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, lock.uri = %self.lock_uri(), "unable to determine lock state");
                LockState::Unknown
            }
        }
    }

    /// Reads and decodes the current lock record.
    pub async fn record(&self) -> LockResult<LockRecord> {
        let body = {
            let _guard = self.guard.lock().await;
            self.storage.read(&self.lock_resource()).await?
        };
        LockRecord::decode(&body)
    }

    async fn ownership(&self) -> LockResult<Ownership> {
        let record = self.record().await?;
        let expired = TimeoutValue::from(self.options.timeout).is_exceeded_by(record.age(now_nanos()));

        Ok(Ownership {
            node_owned: record.node == self.identity.node(),
            session_owned: record.session == self.identity.session(),
            expired,
        })
    }

    /// Waits until the resource is unlocked.
    ///
    /// `None` or a zero timeout waits indefinitely. The internal guard is
    /// never held while sleeping, so a concurrent [`unlock`](Self::unlock)
    /// through a clone of this handle is not blocked.
    ///
    /// # Errors
    ///
    /// * `LockError::Timeout` - the resource was still locked when the
    ///   timeout elapsed
    pub async fn wait_for_lock(&self, timeout: Option<Duration>) -> LockResult<()> {
        let (_cancel_tx, cancel) = watch::channel(false);
        self.wait_for_lock_or_cancel(timeout, cancel).await
    }

    /// Like [`wait_for_lock`](Self::wait_for_lock), but also stops with
    /// `LockError::Cancelled` once `cancel` turns `true`.
    #[instrument(skip(self, cancel), fields(lock.uri = %self.lock_uri(), node = self.node(), backend = S::BACKEND, elapsed_ms = field::Empty))]
    pub async fn wait_for_lock_or_cancel(
        &self,
        timeout: Option<Duration>,
        mut cancel: watch::Receiver<bool>,
    ) -> LockResult<()> {
        let start = std::time::Instant::now();
        let result = with_deadline(
            TimeoutValue::from(timeout),
            self.poll_until_unlocked(&mut cancel),
        )
        .await;
        Span::current().record("elapsed_ms", start.elapsed().as_millis() as u64);
        result
    }

    async fn poll_until_unlocked(&self, cancel: &mut watch::Receiver<bool>) -> LockResult<()> {
        loop {
            ensure_not_cancelled(cancel)?;
            let state = self.current_state().await;
            if state == LockState::Unlocked {
                return Ok(());
            }
            ensure_not_cancelled(cancel)?;

            let pause = poll_pause();
            debug!(%state, pause_ms = pause.as_millis() as u64, "lock busy, polling");
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancelled(cancel) => return Err(LockError::Cancelled),
            }
        }
    }

    /// Alternates `lock` attempts with waits until one attempt succeeds.
    ///
    /// Only the waits count against `timeout`. A `lock` call always runs to
    /// completion, so a record is never written after the caller has been
    /// told the acquisition timed out.
    async fn acquire_until_cancelled(
        &self,
        timeout: TimeoutValue,
        cancel: &mut watch::Receiver<bool>,
    ) -> LockResult<StoreLockHandle<S>> {
        let deadline = timeout
            .as_duration()
            .map(|limit| (limit, Instant::now() + limit));

        loop {
            match self.lock().await {
                Ok(()) => return Ok(StoreLockHandle::new(self.clone())),
                Err(LockError::AlreadyLocked(_)) => {}
                Err(e) => return Err(e),
            }

            match deadline {
                Some((limit, deadline)) => {
                    tokio::time::timeout_at(deadline, self.poll_until_unlocked(cancel))
                        .await
                        .map_err(|source| LockError::Timeout {
                            timeout: limit,
                            source,
                        })??;
                }
                None => self.poll_until_unlocked(cancel).await?,
            }
        }
    }

    /// The record this handle would write right now.
    pub fn lock_body(&self) -> Vec<u8> {
        LockRecord::new(self.identity.node(), self.identity.session(), now_nanos()).encode()
    }

    pub fn identity(&self) -> LockIdentity {
        self.identity
    }

    pub fn node(&self) -> u16 {
        self.identity.node()
    }

    pub fn session(&self) -> u64 {
        self.identity.session()
    }

    pub fn set_node(&mut self, node: u16) {
        self.identity.set_node(node);
    }

    pub fn set_session(&mut self, session: u64) {
        self.identity.set_session(session);
    }

    pub fn node_bytes(&self) -> [u8; 2] {
        self.identity.node_bytes()
    }

    pub fn session_bytes(&self) -> [u8; 8] {
        self.identity.session_bytes()
    }

    pub fn set_node_bytes(&mut self, buf: &[u8]) -> LockResult<()> {
        self.identity.set_node_bytes(buf)
    }

    pub fn set_session_bytes(&mut self, buf: &[u8]) -> LockResult<()> {
        self.identity.set_session_bytes(buf)
    }

    /// The resource being protected.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Name of the lock record on the medium.
    pub fn lock_resource(&self) -> String {
        format!("{}{}", self.resource, self.options.suffix)
    }

    /// URI of the resource being protected.
    pub fn resource_uri(&self) -> String {
        self.storage.uri(&self.resource)
    }

    /// URI of the lock record.
    pub fn lock_uri(&self) -> String {
        self.storage.uri(&self.lock_resource())
    }

    pub fn suffix(&self) -> &str {
        &self.options.suffix
    }

    pub fn set_suffix(&mut self, suffix: impl Into<String>) {
        self.options.suffix = suffix.into();
    }

    /// Lease after which a record counts as abandoned.
    pub fn timeout(&self) -> Duration {
        self.options.timeout
    }

    /// Sets the lease; zero disables expiry.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.options.timeout = timeout;
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: LockStorage> DistributedLock for StoreLock<S> {
    type Handle = StoreLockHandle<S>;

    fn name(&self) -> &str {
        &self.resource
    }

    #[instrument(skip(self), fields(lock.uri = %self.lock_uri(), node = self.node(), backend = S::BACKEND))]
    async fn acquire(&self, timeout: Option<Duration>) -> LockResult<Self::Handle> {
        let (_cancel_tx, mut cancel) = watch::channel(false);
        self.acquire_until_cancelled(TimeoutValue::from(timeout), &mut cancel)
            .await
    }

    async fn try_acquire(&self) -> LockResult<Option<Self::Handle>> {
        match self.lock().await {
            Ok(()) => Ok(Some(StoreLockHandle::new(self.clone()))),
            Err(LockError::AlreadyLocked(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Runs `operation`, failing with `LockError::Timeout` once the timeout
/// elapses. The in-flight step is dropped at that point.
async fn with_deadline<T>(
    timeout: TimeoutValue,
    operation: impl Future<Output = LockResult<T>>,
) -> LockResult<T> {
    match timeout.as_duration() {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|source| LockError::Timeout {
                timeout: limit,
                source,
            })?,
        None => operation.await,
    }
}

fn ensure_not_cancelled(cancel: &watch::Receiver<bool>) -> LockResult<()> {
    let cancelled = *cancel.borrow();
    if cancelled {
        return Err(LockError::Cancelled);
    }
    Ok(())
}

/// Resolves once the cancellation flag turns `true`.
///
/// A dropped sender can no longer cancel, so this then never resolves.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        let flagged = *cancel.borrow_and_update();
        if flagged {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn poll_pause() -> Duration {
    let jitter = rand::thread_rng().gen_range(0..POLL_JITTER_MILLIS);
    POLL_INTERVAL + Duration::from_millis(jitter)
}
