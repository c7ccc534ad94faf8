//! Steward Common - Shared types and errors
//!
//! This crate provides the foundational types used across all Steward components:
//! - Error taxonomy and error codes
//! - The domain `User` view shared by the cache and the coordinator

pub mod error;
pub mod model;

// Re-exports for convenience
pub use error::{ErrorCode, Result, StewardError};
pub use model::User;

/// Namespace used for per-user distributed locks when none is configured
pub const DEFAULT_LOCK_NAMESPACE: &str = "steward";
