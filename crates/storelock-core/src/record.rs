//! Lock record codec.
//!
//! A record is stored at the lock resource as three newline separated,
//! fixed-width little-endian fields:
//!
//! ```text
//! [node: u16] \n [session: u64] \n [timestamp: u64 nanoseconds]
//! ```
//!
//! There is no trailing newline. The fields are located by position, so
//! values whose bytes happen to contain `0x0A` still decode exactly.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{LockError, LockResult};

/// Width of the encoded node id.
pub const NODE_LEN: usize = 2;

/// Width of the encoded session id.
pub const SESSION_LEN: usize = 8;

/// Width of the encoded timestamp.
pub const TIMESTAMP_LEN: usize = 8;

/// Total length of an encoded record.
pub const RECORD_LEN: usize = NODE_LEN + 1 + SESSION_LEN + 1 + TIMESTAMP_LEN;

const SEPARATOR: u8 = b'\n';
const SESSION_START: usize = NODE_LEN + 1;
const TIMESTAMP_START: usize = SESSION_START + SESSION_LEN + 1;

/// Ownership record stored at a lock resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRecord {
    /// Node that wrote the record.
    pub node: u16,
    /// Session of the writing node.
    pub session: u64,
    /// Creation time in nanoseconds since the Unix epoch.
    pub timestamp: u64,
}

impl LockRecord {
    pub fn new(node: u16, session: u64, timestamp: u64) -> Self {
        Self {
            node,
            session,
            timestamp,
        }
    }

    /// Serializes the record into its on-medium form.
    pub fn encode(&self) -> Vec<u8> {
        encode(self.node, self.session, self.timestamp)
    }

    /// Parses a record read from the medium.
    pub fn decode(bytes: &[u8]) -> LockResult<Self> {
        let (node, session, timestamp) = decode(bytes)?;
        Ok(Self::new(node, session, timestamp))
    }

    /// Time elapsed since the record was written, zero if it lies in the future.
    pub fn age(&self, now: u64) -> Duration {
        Duration::from_nanos(now.saturating_sub(self.timestamp))
    }
}

/// Encodes a record.
pub fn encode(node: u16, session: u64, timestamp: u64) -> Vec<u8> {
    let mut body = Vec::with_capacity(RECORD_LEN);
    body.extend_from_slice(&node.to_le_bytes());
    body.push(SEPARATOR);
    body.extend_from_slice(&session.to_le_bytes());
    body.push(SEPARATOR);
    body.extend_from_slice(&timestamp.to_le_bytes());
    body
}

/// Decodes a record into `(node, session, timestamp)`.
pub fn decode(bytes: &[u8]) -> LockResult<(u16, u64, u64)> {
    if bytes.len() != RECORD_LEN {
        return Err(LockError::Format(format!(
            "expected {RECORD_LEN} bytes, found {}",
            bytes.len()
        )));
    }
    if bytes[NODE_LEN] != SEPARATOR || bytes[TIMESTAMP_START - 1] != SEPARATOR {
        return Err(LockError::Format(
            "record fields are not newline separated".to_string(),
        ));
    }

    let node = u16::from_le_bytes(fixed(&bytes[..NODE_LEN])?);
    let session = u64::from_le_bytes(fixed(&bytes[SESSION_START..SESSION_START + SESSION_LEN])?);
    let timestamp = u64::from_le_bytes(fixed(&bytes[TIMESTAMP_START..])?);
    Ok((node, session, timestamp))
}

/// Copies a field into a fixed-size array, checking its width.
pub(crate) fn fixed<const N: usize>(field: &[u8]) -> LockResult<[u8; N]> {
    field.try_into().map_err(|_| {
        LockError::Format(format!(
            "incorrect field length: {} != {N}",
            field.len()
        ))
    })
}

/// Current time in nanoseconds since the Unix epoch.
pub fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
