//! moka-backed user cache
//!
//! Entries are stored JSON-encoded, the same shape a remote key-value cache
//! would hold, so a corrupt entry surfaces as a cache error rather than a
//! silent miss.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use moka::future::Cache;
use steward_common::{Result, StewardError, User};

use crate::config::CacheConfig;
use crate::traits::{CacheStats, UserCache, cache_key};

/// In-process user cache with TTL expiry
pub struct MokaUserCache {
    entries: Cache<String, String>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MokaUserCache {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();
        Self {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    async fn insert_raw(&self, id: i64, value: String) {
        self.entries.insert(cache_key(id), value).await;
    }
}

impl Default for MokaUserCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[async_trait]
impl UserCache for MokaUserCache {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        match self.entries.get(&cache_key(id)).await {
            Some(encoded) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let user = serde_json::from_str(&encoded)
                    .map_err(|e| StewardError::CacheError(format!("decode user {}: {}", id, e)))?;
                Ok(Some(user))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, user: &User) -> Result<()> {
        let encoded = serde_json::to_string(user)
            .map_err(|e| StewardError::CacheError(format!("encode user {}: {}", user.id, e)))?;
        self.entries.insert(cache_key(user.id), encoded).await;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.entries.invalidate(&cache_key(id)).await;
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use steward_common::model::now_millis;

    use super::*;

    fn user(id: i64) -> User {
        let now = now_millis();
        User::new(id, format!("sid-{}", id), "a.png", "Alice", now, now)
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MokaUserCache::default();
        assert!(cache.get(1).await.unwrap().is_none());

        cache.set(&user(1)).await.unwrap();
        let cached = cache.get(1).await.unwrap().unwrap();
        assert_eq!(cached.nickname, "Alice");

        cache.delete(1).await.unwrap();
        assert!(cache.get(1).await.unwrap().is_none());

        // deleting again is fine
        cache.delete(1).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_fields() {
        let cache = MokaUserCache::default();
        let original = user(7);
        cache.set(&original).await.unwrap();
        let cached = cache.get(7).await.unwrap().unwrap();
        assert_eq!(cached, original);
        assert!(cached.is_new);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_error() {
        let cache = MokaUserCache::default();
        cache.insert_raw(3, "not json".to_string()).await;
        let err = cache.get(3).await.unwrap_err();
        assert!(matches!(err, StewardError::CacheError(_)));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = MokaUserCache::new(&CacheConfig::new().with_ttl(Duration::from_millis(50)));
        cache.set(&user(5)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(5).await.unwrap().is_none());
    }
}
