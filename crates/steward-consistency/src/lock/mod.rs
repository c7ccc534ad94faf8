//! Distributed Lock Implementation
//!
//! This module provides:
//! - Distributed lock data model
//! - Lock acquire/release API
//! - Lock auto-release on timeout
//! - Scoped lock guard

mod config;
mod guard;
mod model;
mod service;

pub use config::{
    DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_LOCK_TTL_MS, DEFAULT_LOCK_WAIT_MS, LockConfig,
};
pub use guard::LockGuard;
pub use model::*;
pub use service::*;
