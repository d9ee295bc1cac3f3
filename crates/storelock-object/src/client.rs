//! Object store client capability.
//!
//! Only the four calls the lock needs are modelled. Adapting a concrete
//! SDK client means implementing [`ObjectStoreClient`] and mapping its
//! "no such key" responses to [`ObjectStoreError::NotFound`].

use std::future::Future;

use storelock_core::error::BoxError;
use thiserror::Error;

/// Errors returned by an object store client.
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// The object does not exist.
    #[error("object {key} not found in bucket {bucket}")]
    NotFound { bucket: String, key: String },

    /// Any other failure: transport, permissions, throttling.
    #[error("object store request failed: {0}")]
    Service(#[source] BoxError),
}

impl ObjectStoreError {
    pub fn not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn service(source: impl Into<BoxError>) -> Self {
        Self::Service(source.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Metadata returned by a head request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_length: u64,
    pub content_type: Option<String>,
}

/// Canned ACL applied to written objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    Private,
}

impl ObjectAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
        }
    }
}

/// Server-side encryption requested for written objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSideEncryption {
    /// Encrypt with the given KMS key.
    Kms { key_id: String },
}

impl ServerSideEncryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kms { .. } => "aws:kms",
        }
    }

    pub fn kms_key_id(&self) -> Option<&str> {
        match self {
            Self::Kms { key_id } => Some(key_id.as_str()),
        }
    }
}

/// A put-object request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub acl: ObjectAcl,
    pub server_side_encryption: ServerSideEncryption,
}

/// The object store operations a lock needs.
pub trait ObjectStoreClient: Send + Sync {
    /// Fetches object metadata; a missing object is `ObjectStoreError::NotFound`.
    fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<ObjectMeta, ObjectStoreError>> + Send;

    /// Fetches the object body.
    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ObjectStoreError>> + Send;

    /// Creates or overwrites an object.
    fn put_object(
        &self,
        request: PutObjectRequest,
    ) -> impl Future<Output = Result<(), ObjectStoreError>> + Send;

    /// Deletes an object.
    fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<(), ObjectStoreError>> + Send;
}
