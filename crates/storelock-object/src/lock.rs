//! Object-storage-backed lock storage.

use storelock_core::error::{LockError, LockResult};
use storelock_core::lock::StoreLock;
use storelock_core::storage::{LockState, LockStorage};
use tracing::{debug, trace};
use url::Url;

use crate::client::{ObjectAcl, ObjectStoreClient, ObjectStoreError, PutObjectRequest, ServerSideEncryption};
use crate::content_type::detect_content_type;

/// URI scheme used when none is configured.
pub const DEFAULT_SCHEME: &str = "s3";

/// A lock whose record is an object next to the protected object.
///
/// If the protected object is `s3://bucket/key` the record is written to
/// `s3://bucket/key.lock`.
pub type ObjectLock<C> = StoreLock<ObjectStorage<C>>;

/// Stores lock records as objects in one bucket.
#[derive(Debug, Clone)]
pub struct ObjectStorage<C> {
    client: C,
    bucket: String,
    kms_key_id: String,
    scheme: String,
    legacy_head_errors_unlocked: bool,
}

impl<C: ObjectStoreClient> ObjectStorage<C> {
    pub fn new(client: C, bucket: impl Into<String>, kms_key_id: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            kms_key_id: kms_key_id.into(),
            scheme: DEFAULT_SCHEME.to_string(),
            legacy_head_errors_unlocked: false,
        }
    }

    /// Sets the scheme used when rendering URIs.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Treats every head failure as "no record", not only "not found".
    ///
    /// This masks outages as availability; it exists for parity with
    /// deployments that relied on it.
    pub fn with_legacy_head_errors_unlocked(mut self, enabled: bool) -> Self {
        self.legacy_head_errors_unlocked = enabled;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn kms_key_id(&self) -> &str {
        &self.kms_key_id
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn store_error(&self, operation: &'static str, key: &str, e: ObjectStoreError) -> LockError {
        LockError::backing_store(operation, self.uri(key), e)
    }
}

impl<C: ObjectStoreClient> LockStorage for ObjectStorage<C> {
    const BACKEND: &'static str = "object";

    async fn exists(&self, resource: &str) -> LockResult<LockState> {
        match self.client.head_object(&self.bucket, resource).await {
            Ok(meta) => {
                trace!(key = resource, len = meta.content_length, "lock object present");
                Ok(LockState::Locked)
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(LockState::Unlocked),
            Err(e) if self.legacy_head_errors_unlocked => {
                debug!(key = resource, error = %e, "head failed, assuming unlocked");
                Ok(LockState::Unlocked)
            }
            Err(e) => Err(self.store_error("head", resource, e)),
        }
    }

    async fn read(&self, resource: &str) -> LockResult<Vec<u8>> {
        self.client
            .get_object(&self.bucket, resource)
            .await
            .map_err(|e| self.store_error("get", resource, e))
    }

    async fn write(&self, resource: &str, body: Vec<u8>) -> LockResult<()> {
        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: resource.to_string(),
            content_type: detect_content_type(&body).to_string(),
            body,
            acl: ObjectAcl::Private,
            server_side_encryption: ServerSideEncryption::Kms {
                key_id: self.kms_key_id.clone(),
            },
        };
        self.client
            .put_object(request)
            .await
            .map_err(|e| self.store_error("put", resource, e))
    }

    async fn remove(&self, resource: &str) -> LockResult<()> {
        self.client
            .delete_object(&self.bucket, resource)
            .await
            .map_err(|e| self.store_error("delete", resource, e))
    }

    fn uri(&self, resource: &str) -> String {
        render_uri(&self.scheme, &self.bucket, resource)
    }
}

/// Renders `scheme://bucket/key`, percent-encoding the key where needed.
fn render_uri(scheme: &str, bucket: &str, key: &str) -> String {
    match Url::parse(&format!("{scheme}://{bucket}")) {
        Ok(mut uri) => {
            uri.set_path(key);
            uri.into()
        }
        Err(_) => format!("{scheme}://{bucket}/{}", key.trim_start_matches('/')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::OCTET_STREAM;
    use crate::memory::MemoryObjectStore;
    use storelock_core::record::LockRecord;

    fn object_lock(node: u16, store: &MemoryObjectStore) -> ObjectLock<MemoryObjectStore> {
        ObjectLock::new(node, "key", ObjectStorage::new(store.clone(), "bucket", "kmsKeyArn"))
    }

    #[test]
    fn test_uris() {
        assert_eq!(render_uri("s3", "bucket", "key"), "s3://bucket/key");
        assert_eq!(render_uri("s3", "bucket", "dir/key.lock"), "s3://bucket/dir/key.lock");
        assert_eq!(render_uri("gs", "bucket", "/key"), "gs://bucket/key");
    }

    #[tokio::test]
    async fn test_object_lock() {
        let store = MemoryObjectStore::new();
        let l = object_lock(0, &store);

        assert_eq!(l.resource_uri(), "s3://bucket/key");
        assert_eq!(l.lock_uri(), "s3://bucket/key.lock");
        assert_eq!(l.storage().bucket(), "bucket");
        assert_eq!(l.storage().kms_key_id(), "kmsKeyArn");

        l.lock().await.unwrap();

        let put = store.last_put().unwrap();
        assert_eq!(put.bucket, "bucket");
        assert_eq!(put.key, "key.lock");
        assert_eq!(put.acl, ObjectAcl::Private);
        assert_eq!(put.server_side_encryption.kms_key_id(), Some("kmsKeyArn"));
        assert_eq!(put.server_side_encryption.as_str(), "aws:kms");
        assert_eq!(put.content_type, OCTET_STREAM);
        let record = LockRecord::decode(&put.body).unwrap();
        assert_eq!((record.node, record.session), (0, l.session()));

        l.unlock().await.unwrap();
        assert!(store.object("bucket", "key.lock").is_none());
    }

    #[tokio::test]
    async fn test_head_failure_surfaces() {
        let store = MemoryObjectStore::new();
        let l = object_lock(0, &store);
        store.fail_requests("service unavailable");

        let err = l.lock_state().await.unwrap_err();
        assert!(matches!(err, LockError::BackingStore { operation: "head", .. }));
        assert_eq!(l.current_state().await, LockState::Unknown);
    }

    #[tokio::test]
    async fn test_legacy_head_failure_is_unlocked() {
        let store = MemoryObjectStore::new();
        let storage = ObjectStorage::new(store.clone(), "bucket", "kmsKeyArn")
            .with_legacy_head_errors_unlocked(true);
        let l = ObjectLock::new(0, "key", storage);
        store.fail_requests("service unavailable");

        assert_eq!(l.lock_state().await.unwrap(), LockState::Unlocked);
        // the failure still shows up once the lock touches the object itself
        assert!(matches!(l.lock().await, Err(LockError::BackingStore { operation: "put", .. })));
    }

    #[tokio::test]
    async fn test_custom_scheme() {
        let store = MemoryObjectStore::new();
        let storage = ObjectStorage::new(store, "bucket", "kms").with_scheme("gs");
        let l = ObjectLock::new(0, "key", storage);
        assert_eq!(l.lock_uri(), "gs://bucket/key.lock");
    }
}
