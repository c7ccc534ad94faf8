//! Coordinator configuration

use serde::{Deserialize, Serialize};
use steward_consistency::LockConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyConfig {
    /// Per-user lock settings
    pub lock: LockConfig,
    /// Coalesce same-id misses in this process before asking for the
    /// distributed lock
    pub local_gate: bool,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            lock: LockConfig::default(),
            local_gate: true,
        }
    }
}

impl ConsistencyConfig {
    pub fn with_lock(mut self, lock: LockConfig) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_local_gate(mut self, enabled: bool) -> Self {
        self.local_gate = enabled;
        self
    }
}
