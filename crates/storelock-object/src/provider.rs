//! Object lock provider implementation.

use std::sync::Arc;
use std::time::Duration;

use storelock_core::error::{LockError, LockResult};
use storelock_core::identity::LockIdentity;
use storelock_core::lock::StoreLock;
use storelock_core::options::LockOptions;
use storelock_core::traits::LockProvider;

use crate::client::ObjectStoreClient;
use crate::lock::{DEFAULT_SCHEME, ObjectLock, ObjectStorage};

/// Builder for object-storage lock provider configuration.
pub struct ObjectLockProviderBuilder<C> {
    client: C,
    bucket: Option<String>,
    kms_key_id: Option<String>,
    scheme: String,
    node: Option<u16>,
    session: Option<u64>,
    legacy_head_errors_unlocked: bool,
    options: LockOptions,
}

impl<C: ObjectStoreClient> ObjectLockProviderBuilder<C> {
    /// Creates a new builder around an already configured client.
    pub fn new(client: C) -> Self {
        Self {
            client,
            bucket: None,
            kms_key_id: None,
            scheme: DEFAULT_SCHEME.to_string(),
            node: None,
            session: None,
            legacy_head_errors_unlocked: false,
            options: LockOptions::default(),
        }
    }

    /// Sets the bucket holding protected objects and their locks. Required.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Sets the KMS key used to encrypt lock objects. Required.
    pub fn kms_key_id(mut self, kms_key_id: impl Into<String>) -> Self {
        self.kms_key_id = Some(kms_key_id.into());
        self
    }

    /// Sets the scheme used when rendering URIs (default `s3`).
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
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

    /// Sets the suffix of lock objects (default `.lock`).
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.options.suffix = suffix.into();
        self
    }

    /// Sets the lease after which a lock counts as abandoned; zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Maps every head failure to "unlocked" instead of reporting it.
    pub fn legacy_head_errors_unlocked(mut self, enabled: bool) -> Self {
        self.legacy_head_errors_unlocked = enabled;
        self
    }

    /// Builds the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket, KMS key or node is missing, or the
    /// suffix is empty.
    pub fn build(self) -> LockResult<ObjectLockProvider<C>> {
        let bucket = self
            .bucket
            .filter(|b| !b.is_empty())
            .ok_or_else(|| LockError::Config("bucket not specified".to_string()))?;
        let kms_key_id = self
            .kms_key_id
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LockError::Config("KMS key id not specified".to_string()))?;
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
        let storage = ObjectStorage::new(self.client, bucket, kms_key_id)
            .with_scheme(self.scheme)
            .with_legacy_head_errors_unlocked(self.legacy_head_errors_unlocked);

        Ok(ObjectLockProvider {
            storage: Arc::new(storage),
            identity,
            options: self.options,
        })
    }
}

/// Provider for object-storage locks within one bucket.
pub struct ObjectLockProvider<C> {
    storage: Arc<ObjectStorage<C>>,
    identity: LockIdentity,
    options: LockOptions,
}

impl<C: ObjectStoreClient> ObjectLockProvider<C> {
    /// Returns a new builder for configuring the provider.
    pub fn builder(client: C) -> ObjectLockProviderBuilder<C> {
        ObjectLockProviderBuilder::new(client)
    }

    pub fn identity(&self) -> LockIdentity {
        self.identity
    }

    pub fn bucket(&self) -> &str {
        self.storage.bucket()
    }
}

impl<C: ObjectStoreClient> LockProvider for ObjectLockProvider<C> {
    type Lock = ObjectLock<C>;

    fn create_lock(&self, key: &str) -> Self::Lock {
        StoreLock::with_shared_storage(
            self.identity,
            key,
            Arc::clone(&self.storage),
            self.options.clone(),
        )
    }
}
