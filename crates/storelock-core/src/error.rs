//! Error types for lock operations.

use std::time::Duration;
use thiserror::Error;
use tokio::time::error::Elapsed;

/// Boxed error reported by a storage medium.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The stored lock record is malformed.
    #[error("incompatible lock record format: {0}")]
    Format(String),

    /// A live record owned by someone else blocks acquisition.
    #[error("the object at {0} is locked")]
    AlreadyLocked(String),

    /// Release or override attempted while no record exists.
    #[error("the object at {0} is not locked")]
    NotLocked(String),

    /// Release attempted against a live record owned by another node.
    #[error("the existing lock at {0} is not managed by this process")]
    NotOwned(String),

    /// The storage medium failed.
    #[error("{operation} failed for {uri}: {source}")]
    BackingStore {
        operation: &'static str,
        uri: String,
        #[source]
        source: BoxError,
    },

    /// The wait deadline passed before the resource was unlocked.
    #[error("unable to obtain lock after {timeout:?}")]
    Timeout {
        timeout: Duration,
        #[source]
        source: Elapsed,
    },

    /// The wait was cancelled by the caller.
    #[error("lock operation was cancelled")]
    Cancelled,

    /// Invalid provider or lock configuration.
    #[error("invalid lock configuration: {0}")]
    Config(String),
}

impl LockError {
    /// Wraps a storage failure with the operation and URI it happened on.
    pub fn backing_store(
        operation: &'static str,
        uri: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::BackingStore {
            operation,
            uri: uri.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for failures caused by another owner holding the lock.
    ///
    /// These are the only errors worth retrying; everything else is either a
    /// caller mistake or a storage failure.
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::AlreadyLocked(_) | Self::NotOwned(_))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
