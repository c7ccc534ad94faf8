//! Cache backend trait

use async_trait::async_trait;
use steward_common::{Result, User};

/// Key under which a user is cached
pub fn cache_key(id: i64) -> String {
    format!("user:info:{}", id)
}

/// Cache of user profiles keyed by user id.
///
/// Implementations must be safe for concurrent use. `set` and `delete` are
/// idempotent.
#[async_trait]
pub trait UserCache: Send + Sync {
    /// `Ok(None)` when the user is not cached, `Err` on transport or decode failure
    async fn get(&self, id: i64) -> Result<Option<User>>;

    /// Store a user. Failure is non-fatal to callers.
    async fn set(&self, user: &User) -> Result<()>;

    /// Remove a cached user. Removing an absent entry succeeds.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Get cache statistics
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache (approximate).
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key(42), "user:info:42");
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
