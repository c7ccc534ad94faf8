//! Lock entries and the request/response types of the lock service

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked,
    Locked,
    /// Lease ran out before the holder released
    Expired,
}

/// A named lock and its current lease.
///
/// `expires_at` is set whenever the lock is held, so a holder that never
/// releases blocks others for at most its lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedLock {
    /// `namespace::name`
    pub key: String,
    pub state: LockState,
    /// Token of the current holder, one per acquisition
    pub owner: Option<String>,
    /// Issued by the service on every acquisition, never reused
    pub fence_token: u64,
    /// Unix millis
    pub acquired_at: Option<i64>,
    /// Unix millis
    pub expires_at: Option<i64>,
}

impl DistributedLock {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: LockState::Unlocked,
            owner: None,
            fence_token: 0,
            acquired_at: None,
            expires_at: None,
        }
    }

    /// Held and the lease has not run out
    pub fn is_locked(&self) -> bool {
        self.state == LockState::Locked && !self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| current_timestamp() >= expires_at)
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.is_locked() && self.owner.as_deref() == Some(owner)
    }

    pub fn remaining_ttl_ms(&self) -> u64 {
        match self.expires_at {
            Some(expires_at) => (expires_at - current_timestamp()).max(0) as u64,
            None => 0,
        }
    }

    /// Take the lock for `owner` with a lease of `ttl_ms`, fenced by `fence_token`
    pub fn acquire(&mut self, owner: impl Into<String>, ttl_ms: u64, fence_token: u64) -> bool {
        if self.is_locked() {
            return false;
        }

        let now = current_timestamp();
        self.state = LockState::Locked;
        self.owner = Some(owner.into());
        self.fence_token = fence_token;
        self.acquired_at = Some(now);
        self.expires_at = Some(now + ttl_ms as i64);
        true
    }

    pub fn release(&mut self, owner: &str) -> bool {
        if !self.is_owned_by(owner) {
            return false;
        }

        self.state = LockState::Unlocked;
        self.owner = None;
        self.acquired_at = None;
        self.expires_at = None;
        true
    }

    /// Drop the holder once its lease has run out
    pub fn expire(&mut self) {
        if self.is_expired() {
            self.state = LockState::Expired;
            self.owner = None;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockAcquireRequest {
    pub namespace: String,
    pub name: String,
    /// Owner token, unique per acquisition
    pub owner: String,
    /// Lease length in milliseconds, must be positive
    pub ttl_ms: u64,
    /// How long to wait for the current holder (0 = non-blocking)
    #[serde(default)]
    pub wait_ms: u64,
}

impl Default for LockAcquireRequest {
    fn default() -> Self {
        Self {
            namespace: steward_common::DEFAULT_LOCK_NAMESPACE.to_string(),
            name: String::new(),
            owner: String::new(),
            ttl_ms: super::config::DEFAULT_LOCK_TTL_MS,
            wait_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockAcquireResult {
    pub acquired: bool,
    pub fence_token: u64,
    /// Holder at the time of a failed attempt
    pub current_owner: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockReleaseRequest {
    pub namespace: String,
    pub name: String,
    pub owner: String,
    /// Release only if the lock still carries this token
    #[serde(default)]
    pub fence_token: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockReleaseResult {
    pub released: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockStats {
    /// Lock entries created since start
    pub total_locks: u64,
    /// Currently held
    pub active_locks: u32,
    pub total_acquisitions: u64,
    pub total_releases: u64,
    /// Leases reclaimed after running out
    pub expired_locks: u64,
    /// Attempts that gave up or found the lock busy
    pub failed_acquisitions: u64,
}

/// Map key for a lock
pub fn lock_key(namespace: &str, name: &str) -> String {
    format!("{}::{}", namespace, name)
}

pub(crate) fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
