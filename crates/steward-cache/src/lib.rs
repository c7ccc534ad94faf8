//! Steward Cache - Ephemeral user profile cache
//!
//! The cache is an optimization, never a source of truth. `get` separates
//! "not present" (`Ok(None)`) from a transport failure (`Err`), and `set`
//! returns a `Result` that callers log and discard.

pub mod config;
pub mod memory;
pub mod traits;

pub use config::CacheConfig;
pub use memory::MokaUserCache;
pub use traits::{CacheStats, UserCache, cache_key};
