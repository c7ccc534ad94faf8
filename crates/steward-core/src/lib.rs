//! Steward Core - Cache consistency and user services
//!
//! This crate provides:
//! - The consistency coordinator keeping the cache and the store in step
//!   (read-through on `find_by_id`, invalidate-before-commit on updates)
//! - The access facade for lookups and inserts that bypass the cache
//! - The login flow that verifies credentials and provisions first-time users

pub mod config;
pub mod metrics;
pub mod repository;
pub mod service;

pub use config::ConsistencyConfig;
pub use repository::{CacheConsistencyUserRepository, UserRepository, lock_name, to_domain};
pub use service::{DefaultUserService, IdentityVerifier, StaticIdentityVerifier, UserService};
