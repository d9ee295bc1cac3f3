//! In-process object store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::{ObjectMeta, ObjectStoreClient, ObjectStoreError, PutObjectRequest};
use crate::content_type::OCTET_STREAM;

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<(String, String), StoredObject>,
    last_put: Option<PutObjectRequest>,
    failure: Option<String>,
}

/// An object store held in memory.
///
/// Clones share the same objects. Useful for tests and for exercising the
/// lock protocol without a real bucket.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<State>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of an object body, if present.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
    }

    /// Writes an object directly, bypassing any lock.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.state().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                content_type: OCTET_STREAM.to_string(),
            },
        );
    }

    /// The most recent put request, as received.
    pub fn last_put(&self) -> Option<PutObjectRequest> {
        self.state().last_put.clone()
    }

    /// Makes every following request fail with a service error.
    pub fn fail_requests(&self, message: impl Into<String>) {
        self.state().failure = Some(message.into());
    }

    /// Stops failing requests.
    pub fn recover(&self) {
        self.state().failure = None;
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<MutexGuard<'_, State>, ObjectStoreError> {
        let state = self.state();
        if let Some(message) = state.failure.clone() {
            return Err(ObjectStoreError::service(message));
        }
        Ok(state)
    }
}

impl ObjectStoreClient for MemoryObjectStore {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta, ObjectStoreError> {
        let state = self.check()?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| ObjectMeta {
                content_length: object.body.len() as u64,
                content_type: Some(object.content_type.clone()),
            })
            .ok_or_else(|| ObjectStoreError::not_found(bucket, key))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let state = self.check()?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
            .ok_or_else(|| ObjectStoreError::not_found(bucket, key))
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<(), ObjectStoreError> {
        let mut state = self.check()?;
        state.objects.insert(
            (request.bucket.clone(), request.key.clone()),
            StoredObject {
                body: request.body.clone(),
                content_type: request.content_type.clone(),
            },
        );
        state.last_put = Some(request);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let mut state = self.check()?;
        // deleting a missing key succeeds, as on S3
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ObjectAcl, ServerSideEncryption};

    #[tokio::test]
    async fn test_round_trip_and_failures() {
        let store = MemoryObjectStore::new();
        assert!(store.head_object("b", "k").await.unwrap_err().is_not_found());

        store
            .put_object(PutObjectRequest {
                bucket: "b".into(),
                key: "k".into(),
                body: b"abc".to_vec(),
                content_type: "text/plain; charset=utf-8".into(),
                acl: ObjectAcl::Private,
                server_side_encryption: ServerSideEncryption::Kms {
                    key_id: "key".into(),
                },
            })
            .await
            .unwrap();
        let meta = store.head_object("b", "k").await.unwrap();
        assert_eq!(meta.content_length, 3);
        assert_eq!(store.get_object("b", "k").await.unwrap(), b"abc");

        store.fail_requests("throttled");
        let err = store.head_object("b", "k").await.unwrap_err();
        assert!(!err.is_not_found());
        store.recover();

        store.delete_object("b", "k").await.unwrap();
        store.delete_object("b", "k").await.unwrap();
        assert!(store.object("b", "k").is_none());
    }
}
