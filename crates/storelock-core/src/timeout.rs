//! Timeout value helpers.

use std::time::Duration;

/// Normalized timeout used for both wait deadlines and lease expiry.
///
/// `None` and `Some(Duration::ZERO)` both mean unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutValue {
    limit: Option<Duration>,
}

impl TimeoutValue {
    pub const INFINITE: Self = Self { limit: None };

    pub fn is_infinite(&self) -> bool {
        self.limit.is_none()
    }

    /// Returns the bound, or `None` when unbounded.
    pub fn as_duration(&self) -> Option<Duration> {
        self.limit
    }

    /// Whether something of the given age has outlived this timeout.
    ///
    /// An unbounded timeout never expires anything.
    pub fn is_exceeded_by(&self, age: Duration) -> bool {
        self.limit.is_some_and(|limit| age > limit)
    }
}

impl From<Option<Duration>> for TimeoutValue {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(d) if !d.is_zero() => Self { limit: Some(d) },
            _ => Self::INFINITE,
        }
    }
}

impl From<Duration> for TimeoutValue {
    fn from(timeout: Duration) -> Self {
        Self::from(Some(timeout))
    }
}
