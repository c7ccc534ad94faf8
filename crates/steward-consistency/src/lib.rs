//! Steward Consistency - Distributed locking
//!
//! This crate provides:
//! - Lease-based distributed lock model with fence tokens
//! - Lock acquire/release API with bounded, FIFO waiting
//! - Lock auto-release on lease expiry
//! - Scoped lock handles that release on every exit path

pub mod lock;

// Re-export lock types
pub use lock::{
    DistributedLock, DistributedLockService, LockAcquireRequest, LockAcquireResult, LockConfig,
    LockGuard, LockReleaseRequest, LockReleaseResult, LockState, LockStats, MemoryLockService,
};
