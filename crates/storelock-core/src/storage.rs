//! Storage capability consumed by the lock engine.

use std::fmt;
use std::future::Future;

use crate::error::LockResult;

/// Observed state of a lock resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// A record exists at the lock resource.
    Locked,
    /// No record exists at the lock resource.
    Unlocked,
    /// The medium could not be read for a reason other than absence.
    Unknown,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A medium that can hold lock records.
///
/// Every method addresses the lock resource by its full name (resource
/// plus suffix). Each call is expected to be atomic on the medium; nothing
/// more is assumed.
pub trait LockStorage: Send + Sync {
    /// Short backend name used in tracing fields.
    const BACKEND: &'static str;

    /// Reports whether a record exists.
    ///
    /// Absence is `Ok(LockState::Unlocked)`; any other failure is an error.
    fn exists(&self, resource: &str) -> impl Future<Output = LockResult<LockState>> + Send;

    /// Reads the raw bytes of the current record.
    fn read(&self, resource: &str) -> impl Future<Output = LockResult<Vec<u8>>> + Send;

    /// Creates or overwrites the record.
    fn write(&self, resource: &str, body: Vec<u8>) -> impl Future<Output = LockResult<()>> + Send;

    /// Deletes the record.
    fn remove(&self, resource: &str) -> impl Future<Output = LockResult<()>> + Send;

    /// Renders the URI of a resource on this medium.
    fn uri(&self, resource: &str) -> String;
}
