// Standalone persistence backend kept entirely in memory
// Provides single-node storage without an external database

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use steward_common::model::now_millis;
use steward_common::{Result, StewardError};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{NewUser, ProfileUpdate, StorageMode, UserRecord};
use crate::traits::{UserPersistence, UserTransaction};

/// Standalone in-memory persistence
///
/// Rows are indexed by id and by external id. Transactions take a per-row
/// lock on first update and hold it until commit or rollback, the way a row
/// lock behaves in the external database.
pub struct MemoryPersistService {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    rows: RwLock<Rows>,
    row_locks: DashMap<i64, Arc<Mutex<()>>>,
    next_id: AtomicI64,
    stats: StoreStatsCollector,
}

#[derive(Default)]
struct Rows {
    by_id: HashMap<i64, UserRecord>,
    by_external_id: HashMap<String, i64>,
}

#[derive(Default)]
struct StoreStatsCollector {
    id_reads: AtomicU64,
    external_id_reads: AtomicU64,
    inserts: AtomicU64,
    committed_updates: AtomicU64,
}

/// Store statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Lookups by id
    pub id_reads: u64,
    /// Lookups by external id
    pub external_id_reads: u64,
    /// Successful inserts
    pub inserts: u64,
    /// Profile updates made visible by a commit
    pub committed_updates: u64,
}

impl MemoryPersistService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                rows: RwLock::new(Rows::default()),
                row_locks: DashMap::new(),
                next_id: AtomicI64::new(1),
                stats: StoreStatsCollector::default(),
            }),
        }
    }

    /// Get store statistics
    pub fn stats(&self) -> StoreStats {
        let stats = &self.inner.stats;
        StoreStats {
            id_reads: stats.id_reads.load(Ordering::Relaxed),
            external_id_reads: stats.external_id_reads.load(Ordering::Relaxed),
            inserts: stats.inserts.load(Ordering::Relaxed),
            committed_updates: stats.committed_updates.load(Ordering::Relaxed),
        }
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        self.inner.rows.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryPersistService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserPersistence for MemoryPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Standalone
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn user_find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        self.inner.stats.id_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.inner.rows.read().by_id.get(&id).cloned())
    }

    async fn user_find_by_external_id(&self, external_id: &str) -> Result<Option<UserRecord>> {
        self.inner
            .stats
            .external_id_reads
            .fetch_add(1, Ordering::Relaxed);
        let rows = self.inner.rows.read();
        Ok(rows
            .by_external_id
            .get(external_id)
            .and_then(|id| rows.by_id.get(id))
            .cloned())
    }

    async fn user_insert(&self, user: NewUser) -> Result<i64> {
        let mut rows = self.inner.rows.write();
        if rows.by_external_id.contains_key(&user.external_id) {
            return Err(StewardError::DuplicateKey(user.external_id));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let now = now_millis();
        rows.by_external_id.insert(user.external_id.clone(), id);
        rows.by_id.insert(
            id,
            UserRecord {
                id,
                external_id: user.external_id,
                nickname: user.nickname,
                avatar: user.avatar,
                created_at: now,
                updated_at: now,
            },
        );
        self.inner.stats.inserts.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    async fn begin(&self) -> Result<Box<dyn UserTransaction>> {
        Ok(Box::new(MemoryTransaction {
            inner: self.inner.clone(),
            pending: HashMap::new(),
            locked: HashSet::new(),
            guards: Vec::new(),
        }))
    }
}

/// Staged profile change inside a `MemoryTransaction`
struct PendingUpdate {
    nickname: String,
    avatar: String,
    updated_at: DateTime<Utc>,
}

/// Transaction on the standalone store
pub struct MemoryTransaction {
    inner: Arc<MemoryInner>,
    pending: HashMap<i64, PendingUpdate>,
    locked: HashSet<i64>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl MemoryTransaction {
    async fn lock_row(&mut self, id: i64) {
        if self.locked.contains(&id) {
            return;
        }
        let row_lock = self
            .inner
            .row_locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        self.guards.push(row_lock.lock_owned().await);
        self.locked.insert(id);
    }
}

#[async_trait]
impl UserTransaction for MemoryTransaction {
    async fn user_update_profile(&mut self, update: &ProfileUpdate) -> Result<()> {
        self.lock_row(update.id).await;

        let previous = match self.pending.get(&update.id) {
            Some(staged) => staged.updated_at,
            None => match self.inner.rows.read().by_id.get(&update.id) {
                Some(row) => row.updated_at,
                None => return Err(StewardError::UserNotFound(update.id.to_string())),
            },
        };

        // updated_at must move forward even within the creation millisecond
        let updated_at = now_millis().max(previous + Duration::milliseconds(1));
        self.pending.insert(
            update.id,
            PendingUpdate {
                nickname: update.nickname.clone(),
                avatar: update.avatar.clone(),
                updated_at,
            },
        );
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        let mut rows = self.inner.rows.write();
        for (id, staged) in pending {
            if let Some(row) = rows.by_id.get_mut(&id) {
                row.nickname = staged.nickname;
                row.avatar = staged.avatar;
                row.updated_at = staged.updated_at;
                self.inner
                    .stats
                    .committed_updates
                    .fetch_add(1, Ordering::Relaxed);
            }
        }
        // Row locks are released when the transaction is dropped
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryPersistService::new();
        let id = store
            .user_insert(NewUser::with_external_id("2021213001"))
            .await
            .unwrap();

        let by_id = store.user_find_by_id(id).await.unwrap().unwrap();
        assert_eq!(by_id.external_id, "2021213001");
        assert_eq!(by_id.created_at, by_id.updated_at);

        let by_external = store
            .user_find_by_external_id("2021213001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_external, by_id);

        let stats = store.stats();
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.id_reads, 1);
        assert_eq!(stats.external_id_reads, 1);
    }

    #[tokio::test]
    async fn test_duplicate_external_id() {
        let store = MemoryPersistService::new();
        store
            .user_insert(NewUser::with_external_id("2021213001"))
            .await
            .unwrap();

        let err = store
            .user_insert(NewUser::with_external_id("2021213001"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = MemoryPersistService::new();
        let a = store.user_insert(NewUser::with_external_id("a")).await.unwrap();
        let b = store.user_insert(NewUser::with_external_id("b")).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_update_invisible_until_commit() {
        let store = MemoryPersistService::new();
        let id = store.user_insert(NewUser::with_external_id("a")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.user_update_profile(&ProfileUpdate::new(id, "Alice", "a.png"))
            .await
            .unwrap();
        let before = store.user_find_by_id(id).await.unwrap().unwrap();
        assert_eq!(before.nickname, "");

        tx.commit().await.unwrap();
        let after = store.user_find_by_id(id).await.unwrap().unwrap();
        assert_eq!(after.nickname, "Alice");
        assert_eq!(after.avatar, "a.png");
        assert!(after.updated_at > after.created_at);
        assert_eq!(store.stats().committed_updates, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_update() {
        let store = MemoryPersistService::new();
        let id = store.user_insert(NewUser::with_external_id("a")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.user_update_profile(&ProfileUpdate::new(id, "Alice", "a.png"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let row = store.user_find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.nickname, "");
        assert_eq!(row.created_at, row.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = MemoryPersistService::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .user_update_profile(&ProfileUpdate::new(404, "x", "y"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_row_lock_serializes_transactions() {
        let store = Arc::new(MemoryPersistService::new());
        let id = store.user_insert(NewUser::with_external_id("a")).await.unwrap();

        let mut first = store.begin().await.unwrap();
        first
            .user_update_profile(&ProfileUpdate::new(id, "first", ""))
            .await
            .unwrap();

        let store2 = store.clone();
        let second = tokio::spawn(async move {
            let mut tx = store2.begin().await.unwrap();
            tx.user_update_profile(&ProfileUpdate::new(id, "second", ""))
                .await
                .unwrap();
            tx.commit().await.unwrap();
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!second.is_finished());

        first.commit().await.unwrap();
        second.await.unwrap();

        let row = store.user_find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.nickname, "second");
    }
}
