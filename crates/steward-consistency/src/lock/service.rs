//! Distributed Lock Service Implementation
//!
//! Provides:
//! - Lock acquire/release API with a FIFO waiter queue
//! - Lock auto-release on lease expiry
//! - Entries that live only while a lock is held or waited on

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use steward_common::{Result, StewardError};
use tokio::sync::mpsc;
use tokio::time::interval;

use super::model::*;

/// Distributed Lock Service trait
#[async_trait]
pub trait DistributedLockService: Send + Sync {
    /// Acquire a lock, waiting up to `wait_ms` for the current holder
    async fn acquire(&self, request: LockAcquireRequest) -> Result<LockAcquireResult>;

    /// Release a lock
    async fn release(&self, request: LockReleaseRequest) -> Result<LockReleaseResult>;

    /// Get a lock by key; `None` when nobody holds or waits for it
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<DistributedLock>>;

    /// Get lock statistics
    async fn get_stats(&self) -> LockStats;
}

/// In-memory lock service implementation
///
/// Serves every caller that shares the instance. A networked lock service
/// implements the same trait.
pub struct MemoryLockService {
    table: Arc<LockTable>,
    /// Background task handle
    cleanup_handle: Option<tokio::task::JoinHandle<()>>,
}

#[derive(Default)]
struct LockTable {
    locks: DashMap<String, DistributedLock>,
    /// Waiters per key, in arrival order
    waiters: DashMap<String, VecDeque<LockWaiter>>,
    stats: LockStatsCollector,
    /// Last fence token issued, shared by all keys
    fence: AtomicU64,
}

struct LockWaiter {
    owner: String,
    ttl_ms: u64,
    tx: mpsc::Sender<LockAcquireResult>,
    deadline: Instant,
}

#[derive(Default)]
struct LockStatsCollector {
    total_locks: AtomicU64,
    total_acquisitions: AtomicU64,
    total_releases: AtomicU64,
    expired_locks: AtomicU64,
    failed_acquisitions: AtomicU64,
}

// Entry guards are always taken locks first, then waiters.
impl LockTable {
    fn next_fence(&self) -> u64 {
        self.fence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Drop a holder whose lease ran out. Returns whether it did.
    fn expire_if_due(&self, lock: &mut DistributedLock) -> bool {
        if lock.state != LockState::Locked || !lock.is_expired() {
            return false;
        }
        tracing::warn!(
            lock = %lock.key,
            owner = ?lock.owner,
            "Lock lease expired before release"
        );
        lock.expire();
        self.stats.expired_locks.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("steward_lock_expired_total").increment(1);
        true
    }

    /// Give a free lock to the first waiter still waiting.
    ///
    /// Callers hold the lock entry, so a waiter that is giving up cannot be
    /// picked concurrently with its removal.
    fn hand_off(&self, lock: &mut DistributedLock) {
        let Some(mut queue) = self.waiters.get_mut(&lock.key) else {
            return;
        };

        while let Some(waiter) = queue.pop_front() {
            if waiter.deadline <= Instant::now() {
                continue;
            }
            let fence_token = self.next_fence();
            if !lock.acquire(&waiter.owner, waiter.ttl_ms, fence_token) {
                queue.push_front(waiter);
                return;
            }

            let result = LockAcquireResult {
                acquired: true,
                fence_token,
                ..Default::default()
            };
            if waiter.tx.try_send(result).is_ok() {
                return;
            }
            // Waiter went away; undo and try the next one
            lock.release(&waiter.owner);
        }
    }

    /// Forget `key` once it is neither held nor waited on.
    ///
    /// Must not be called while holding an entry guard for `key`.
    fn prune(&self, key: &str) {
        self.waiters.remove_if(key, |_, queue| queue.is_empty());
        self.locks.remove_if(key, |_, lock| {
            lock.state != LockState::Locked && !self.waiters.contains_key(key)
        });
    }

    /// Expire the lock under `key` if its lease ran out and pass it on
    fn reclaim(&self, key: &str) {
        if let Some(mut lock) = self.locks.get_mut(key) {
            self.expire_if_due(&mut lock);
            if !lock.is_locked() {
                self.hand_off(&mut lock);
            }
        }
        self.prune(key);
    }

    /// Remove a waiter that gave up
    fn remove_waiter(&self, key: &str, owner: &str) {
        {
            // Hold the lock entry so hand-off and removal are ordered
            let _lock = self.locks.get_mut(key);
            if let Some(mut queue) = self.waiters.get_mut(key) {
                queue.retain(|w| w.owner != owner);
            }
        }
        self.prune(key);
    }

    fn cleanup_expired_locks(&self) {
        let mut stale = Vec::new();
        let mut active = 0u32;

        for entry in self.locks.iter() {
            if entry.is_locked() {
                active += 1;
            } else {
                stale.push(entry.key.clone());
            }
        }

        for key in stale {
            self.reclaim(&key);
        }

        metrics::gauge!("steward_lock_active").set(active as f64);
    }
}

impl MemoryLockService {
    pub fn new() -> Self {
        Self {
            table: Arc::new(LockTable::default()),
            cleanup_handle: None,
        }
    }

    /// Start with background cleanup task that reclaims expired leases
    pub fn with_cleanup(mut self, interval_ms: u64) -> Self {
        let table = self.table.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
            loop {
                ticker.tick().await;
                table.cleanup_expired_locks();
            }
        });

        self.cleanup_handle = Some(handle);
        self
    }
}

impl Default for MemoryLockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryLockService {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl DistributedLockService for MemoryLockService {
    async fn acquire(&self, request: LockAcquireRequest) -> Result<LockAcquireResult> {
        if request.ttl_ms == 0 {
            return Err(StewardError::LockError(format!(
                "lock '{}' requires a positive lease",
                request.name
            )));
        }

        let table = &self.table;
        let key = lock_key(&request.namespace, &request.name);
        let deadline = Instant::now() + Duration::from_millis(request.wait_ms);

        let (mut rx, current_owner) = {
            let mut lock = table.locks.entry(key.clone()).or_insert_with(|| {
                table.stats.total_locks.fetch_add(1, Ordering::Relaxed);
                DistributedLock::new(key.clone())
            });

            table.expire_if_due(&mut lock);

            // Callers already queued go first
            if !lock.is_locked() {
                table.hand_off(&mut lock);
            }

            if !lock.is_locked() {
                let fence_token = table.next_fence();
                lock.acquire(&request.owner, request.ttl_ms, fence_token);
                table
                    .stats
                    .total_acquisitions
                    .fetch_add(1, Ordering::Relaxed);

                return Ok(LockAcquireResult {
                    acquired: true,
                    fence_token,
                    ..Default::default()
                });
            }

            // Lock is held by someone else
            let current_owner = lock.owner.clone();

            // If no wait time, return immediately
            if request.wait_ms == 0 {
                table
                    .stats
                    .failed_acquisitions
                    .fetch_add(1, Ordering::Relaxed);
                return Ok(LockAcquireResult {
                    acquired: false,
                    current_owner,
                    error: Some("Lock is held by another owner".to_string()),
                    ..Default::default()
                });
            }

            // Queue up while still holding the entry so a release cannot slip in between
            let (tx, rx) = mpsc::channel(1);
            table
                .waiters
                .entry(key.clone())
                .or_default()
                .push_back(LockWaiter {
                    owner: request.owner.clone(),
                    ttl_ms: request.ttl_ms,
                    tx,
                    deadline,
                });

            (rx, current_owner)
        };

        // Wait for a hand-off, waking when the holder's lease would run out
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let lease_left = table
                .locks
                .get(&key)
                .map(|l| l.remaining_ttl_ms())
                .unwrap_or(0);
            let nap = (deadline - now).min(Duration::from_millis(lease_left.max(1)));

            match tokio::time::timeout(nap, rx.recv()).await {
                Ok(Some(result)) => {
                    table
                        .stats
                        .total_acquisitions
                        .fetch_add(1, Ordering::Relaxed);
                    return Ok(result);
                }
                Ok(None) => break,
                Err(_) => table.reclaim(&key),
            }
        }

        // Timeout - remove from waiters
        table.remove_waiter(&key, &request.owner);
        rx.close();
        if let Ok(result) = rx.try_recv() {
            // Handed off just before giving up
            table
                .stats
                .total_acquisitions
                .fetch_add(1, Ordering::Relaxed);
            return Ok(result);
        }

        table
            .stats
            .failed_acquisitions
            .fetch_add(1, Ordering::Relaxed);
        Ok(LockAcquireResult {
            acquired: false,
            current_owner,
            error: Some("Lock acquisition timeout".to_string()),
            ..Default::default()
        })
    }

    async fn release(&self, request: LockReleaseRequest) -> Result<LockReleaseResult> {
        let table = &self.table;
        let key = lock_key(&request.namespace, &request.name);

        let result = match table.locks.get_mut(&key) {
            None => LockReleaseResult {
                released: false,
                error: Some("Lock not found".to_string()),
            },
            Some(lock)
                if request
                    .fence_token
                    .is_some_and(|expected| lock.fence_token != expected) =>
            {
                LockReleaseResult {
                    released: false,
                    error: Some("Fence token mismatch".to_string()),
                }
            }
            Some(lock) if !lock.is_owned_by(&request.owner) => LockReleaseResult {
                released: false,
                error: Some("Not the lock owner".to_string()),
            },
            Some(mut lock) => {
                lock.release(&request.owner);
                table.stats.total_releases.fetch_add(1, Ordering::Relaxed);

                // Notify first waiter
                table.hand_off(&mut lock);
                LockReleaseResult {
                    released: true,
                    error: None,
                }
            }
        };

        table.prune(&key);
        Ok(result)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<DistributedLock>> {
        let key = lock_key(namespace, name);
        Ok(self.table.locks.get(&key).map(|l| l.clone()))
    }

    async fn get_stats(&self) -> LockStats {
        let table = &self.table;
        let active_locks = table.locks.iter().filter(|l| l.is_locked()).count() as u32;

        LockStats {
            total_locks: table.stats.total_locks.load(Ordering::Relaxed),
            active_locks,
            total_acquisitions: table.stats.total_acquisitions.load(Ordering::Relaxed),
            total_releases: table.stats.total_releases.load(Ordering::Relaxed),
            expired_locks: table.stats.expired_locks.load(Ordering::Relaxed),
            failed_acquisitions: table.stats.failed_acquisitions.load(Ordering::Relaxed),
        }
    }
}
