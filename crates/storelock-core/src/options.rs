use std::time::Duration;

/// Default lease after which an unreleased lock counts as abandoned.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default suffix appended to the resource to form the lock resource.
pub const DEFAULT_SUFFIX: &str = ".lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// Appended to the resource path or key to name the lock record.
    pub suffix: String,
    /// Lease duration; zero disables expiry.
    pub timeout: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
