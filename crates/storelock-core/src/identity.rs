//! Participant identity: a stable node id plus a per-instance session.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::LockResult;
use crate::record::{fixed, now_nanos};

/// Identity written into every lock record.
///
/// The node is assigned externally and survives restarts. The session is
/// derived from the construction time and acts as a fencing token that
/// tells successive instances of the same node apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockIdentity {
    node: u16,
    session: u64,
}

impl LockIdentity {
    /// Creates an identity for `node` with a fresh session.
    pub fn new(node: u16) -> Self {
        Self {
            node,
            session: next_session(),
        }
    }

    /// Creates an identity with an explicit session, e.g. to act on a lock
    /// taken by an earlier invocation.
    pub fn with_session(node: u16, session: u64) -> Self {
        Self { node, session }
    }

    pub fn node(&self) -> u16 {
        self.node
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn set_node(&mut self, node: u16) {
        self.node = node;
    }

    pub fn set_session(&mut self, session: u64) {
        self.session = session;
    }

    /// Little-endian encoding of the node id.
    pub fn node_bytes(&self) -> [u8; 2] {
        self.node.to_le_bytes()
    }

    /// Little-endian encoding of the session id.
    pub fn session_bytes(&self) -> [u8; 8] {
        self.session.to_le_bytes()
    }

    /// Sets the node from its little-endian encoding.
    pub fn set_node_bytes(&mut self, buf: &[u8]) -> LockResult<()> {
        self.node = u16::from_le_bytes(fixed(buf)?);
        Ok(())
    }

    /// Sets the session from its little-endian encoding.
    pub fn set_session_bytes(&mut self, buf: &[u8]) -> LockResult<()> {
        self.session = u64::from_le_bytes(fixed(buf)?);
        Ok(())
    }
}

/// Returns a session id based on the current time, strictly increasing
/// within this process even when the clock stalls.
fn next_session() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = now_nanos();
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.wrapping_add(1));
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}
