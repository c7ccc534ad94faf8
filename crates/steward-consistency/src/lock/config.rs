//! Lock configuration shared by every lock user in a process

use serde::{Deserialize, Serialize};
use steward_common::DEFAULT_LOCK_NAMESPACE;

/// Default lease length
pub const DEFAULT_LOCK_TTL_MS: u64 = 8000;
/// Default bounded wait for a busy lock
pub const DEFAULT_LOCK_WAIT_MS: u64 = 5000;
/// Default expire scanner interval
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Namespace all lock names are scoped to
    pub namespace: String,
    /// Lease length; a holder that never releases loses the lock after this
    pub ttl_ms: u64,
    /// How long an acquirer waits for a busy lock
    pub wait_ms: u64,
    /// Interval of the expired-lease scanner
    pub cleanup_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_LOCK_NAMESPACE.to_string(),
            ttl_ms: DEFAULT_LOCK_TTL_MS,
            wait_ms: DEFAULT_LOCK_WAIT_MS,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
        }
    }
}

impl LockConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_wait_ms(mut self, wait_ms: u64) -> Self {
        self.wait_ms = wait_ms;
        self
    }

    pub fn with_cleanup_interval_ms(mut self, cleanup_interval_ms: u64) -> Self {
        self.cleanup_interval_ms = cleanup_interval_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LockConfig::default();
        assert_eq!(config.namespace, "steward");
        assert_eq!(config.ttl_ms, 8000);
        assert_eq!(config.wait_ms, 5000);
    }

    #[test]
    fn test_builders() {
        let config = LockConfig::default()
            .with_namespace("tenant-a")
            .with_ttl_ms(100)
            .with_wait_ms(0)
            .with_cleanup_interval_ms(50);
        assert_eq!(config.namespace, "tenant-a");
        assert_eq!(config.ttl_ms, 100);
        assert_eq!(config.wait_ms, 0);
        assert_eq!(config.cleanup_interval_ms, 50);
    }
}
