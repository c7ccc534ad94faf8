// Consistency coordinator over the store, the cache and the per-user lock
//
// Reads: cache hit returns without coordination. A miss (or a cache error)
// takes the per-user lock, re-checks the cache, then reads the store and
// repopulates the cache.
//
// Writes: the row is changed inside a store transaction, then the per-user
// lock is taken and the cache entry deleted before the transaction commits.
// If the entry cannot be deleted the change is rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use steward_cache::UserCache;
use steward_common::{Result, StewardError, User};
use steward_consistency::{DistributedLockService, LockGuard};
use steward_persistence::{NewUser, ProfileUpdate, UserPersistence, UserTransaction};
use tracing::{debug, error, warn};

use super::gate::KeyedGate;
use super::{UserRepository, lock_name, to_domain};
use crate::config::ConsistencyConfig;
use crate::metrics;

pub struct CacheConsistencyUserRepository {
    store: Arc<dyn UserPersistence>,
    cache: Arc<dyn UserCache>,
    locks: Arc<dyn DistributedLockService>,
    config: ConsistencyConfig,
    gate: Option<KeyedGate>,
}

impl CacheConsistencyUserRepository {
    pub fn new(
        store: Arc<dyn UserPersistence>,
        cache: Arc<dyn UserCache>,
        locks: Arc<dyn DistributedLockService>,
        config: ConsistencyConfig,
    ) -> Self {
        let gate = config.local_gate.then(KeyedGate::default);
        Self {
            store,
            cache,
            locks,
            config,
            gate,
        }
    }

    pub fn config(&self) -> &ConsistencyConfig {
        &self.config
    }

    async fn lock(&self, id: i64) -> Result<LockGuard> {
        LockGuard::acquire(self.locks.clone(), &self.config.lock, &lock_name(id)).await
    }

    async fn release(&self, guard: LockGuard, id: i64) {
        let lock = guard.name().to_string();
        if let Err(e) = guard.release().await {
            warn!(uid = id, lock = %lock, error = %e, "Failed to release user lock");
        }
    }

    /// Cached user, treating a cache failure as a miss
    async fn cached(&self, id: i64) -> Option<User> {
        match self.cache.get(id).await {
            Ok(user) => user,
            Err(e) => {
                metrics::record_cache_error("get");
                error!(uid = id, error = %e, "Failed to read user cache");
                None
            }
        }
    }

    /// Miss path, run while holding the per-user lock
    async fn load(&self, id: i64) -> Result<User> {
        // Another holder of the lock may have repopulated the entry already
        if let Some(user) = self.cached(id).await {
            return Ok(user);
        }

        metrics::record_store_read();
        let record = self
            .store
            .user_find_by_id(id)
            .await?
            .ok_or_else(|| StewardError::UserNotFound(id.to_string()))?;
        let user = to_domain(record);

        if let Err(e) = self.cache.set(&user).await {
            metrics::record_cache_error("set");
            error!(uid = id, error = %e, "Failed to write user cache");
        }

        Ok(user)
    }

    async fn load_locked(&self, id: i64) -> Result<User> {
        let guard = self.lock(id).await?;
        let result = self.load(id).await;
        self.release(guard, id).await;
        result
    }

    async fn rollback(&self, txn: Box<dyn UserTransaction>, id: i64) {
        if let Err(e) = txn.rollback().await {
            error!(uid = id, error = %e, "Failed to roll back profile update");
        }
    }
}

#[async_trait]
impl UserRepository for CacheConsistencyUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<User> {
        if let Some(user) = self.cached(id).await {
            metrics::record_cache_hit();
            return Ok(user);
        }
        metrics::record_cache_miss();

        match &self.gate {
            Some(gate) => gate.run(id, self.load_locked(id)).await,
            None => self.load_locked(id).await,
        }
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        let id = update.id;

        let mut txn = self.store.begin().await?;
        if let Err(e) = txn.user_update_profile(update).await {
            self.rollback(txn, id).await;
            return Err(e);
        }

        let guard = match self.lock(id).await {
            Ok(guard) => guard,
            Err(e) => {
                self.rollback(txn, id).await;
                return Err(e);
            }
        };

        if let Err(e) = self.cache.delete(id).await {
            metrics::record_cache_error("delete");
            error!(uid = id, error = %e, "Failed to invalidate user cache, rolling back");
            self.rollback(txn, id).await;
            self.release(guard, id).await;
            return Err(e);
        }
        metrics::record_invalidation();

        let committed = txn.commit().await;
        self.release(guard, id).await;

        if committed.is_ok() {
            debug!(uid = id, "Profile updated");
        }
        committed
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<User> {
        self.store
            .user_find_by_external_id(external_id)
            .await?
            .map(to_domain)
            .ok_or_else(|| StewardError::UserNotFound(external_id.to_string()))
    }

    async fn create(&self, user: NewUser) -> Result<i64> {
        self.store.user_insert(user).await
    }
}
