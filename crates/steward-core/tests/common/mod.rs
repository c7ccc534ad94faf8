//! Shared fixtures for the coordinator tests: in-memory backends wrapped with
//! switches that inject failures and counters that observe traffic.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use steward_cache::{CacheStats, MokaUserCache, UserCache};
use steward_common::{Result, StewardError, User};
use steward_consistency::{
    DistributedLock, DistributedLockService, LockAcquireRequest, LockAcquireResult, LockConfig,
    LockReleaseRequest, LockReleaseResult, LockStats, MemoryLockService,
};
use steward_core::{CacheConsistencyUserRepository, ConsistencyConfig};
use steward_persistence::{
    MemoryPersistService, NewUser, ProfileUpdate, StorageMode, UserPersistence, UserRecord,
    UserTransaction,
};

/// Cache that counts calls and fails on demand
#[derive(Default)]
pub struct FaultyCache {
    inner: MokaUserCache,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_delete: AtomicBool,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FaultyCache {
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Peek without going through the counters
    pub async fn peek(&self, id: i64) -> Option<User> {
        self.inner.get(id).await.unwrap()
    }
}

#[async_trait]
impl UserCache for FaultyCache {
    async fn get(&self, id: i64) -> Result<Option<User>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StewardError::CacheError("connection refused".to_string()));
        }
        self.inner.get(id).await
    }

    async fn set(&self, user: &User) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StewardError::CacheError("connection refused".to_string()));
        }
        self.inner.set(user).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StewardError::CacheError("connection refused".to_string()));
        }
        self.inner.delete(id).await
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

/// Lock service whose acquire or release can be made to fail
#[derive(Default)]
pub struct FaultyLocks {
    pub inner: MemoryLockService,
    pub fail_acquire: AtomicBool,
    pub fail_release: AtomicBool,
}

#[async_trait]
impl DistributedLockService for FaultyLocks {
    async fn acquire(&self, request: LockAcquireRequest) -> Result<LockAcquireResult> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(StewardError::LockError("lock service unreachable".to_string()));
        }
        self.inner.acquire(request).await
    }

    async fn release(&self, request: LockReleaseRequest) -> Result<LockReleaseResult> {
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(StewardError::LockError("lock service unreachable".to_string()));
        }
        self.inner.release(request).await
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<DistributedLock>> {
        self.inner.get(namespace, name).await
    }

    async fn get_stats(&self) -> LockStats {
        self.inner.get_stats().await
    }
}

/// Store that slows down reads by id so concurrent callers overlap, and whose
/// transactions can be made to fail on commit
pub struct SlowStore {
    pub inner: Arc<MemoryPersistService>,
    delay: Duration,
    fail_commit: Arc<AtomicBool>,
}

/// Transaction that discards its changes and errors when committed while
/// `fail_commit` is set
struct FaultyTransaction {
    inner: Box<dyn UserTransaction>,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl UserTransaction for FaultyTransaction {
    async fn user_update_profile(&mut self, update: &ProfileUpdate) -> Result<()> {
        self.inner.user_update_profile(update).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            self.inner.rollback().await?;
            return Err(StewardError::DatabaseError("commit lost connection".to_string()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl UserPersistence for SlowStore {
    fn storage_mode(&self) -> StorageMode {
        self.inner.storage_mode()
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }

    async fn user_find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.user_find_by_id(id).await
    }

    async fn user_find_by_external_id(&self, external_id: &str) -> Result<Option<UserRecord>> {
        self.inner.user_find_by_external_id(external_id).await
    }

    async fn user_insert(&self, user: NewUser) -> Result<i64> {
        self.inner.user_insert(user).await
    }

    async fn begin(&self) -> Result<Box<dyn UserTransaction>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fail_commit: self.fail_commit.clone(),
        }))
    }
}

pub struct Harness {
    pub store: Arc<MemoryPersistService>,
    pub cache: Arc<FaultyCache>,
    pub locks: Arc<FaultyLocks>,
    pub fail_commit: Arc<AtomicBool>,
    pub repo: Arc<CacheConsistencyUserRepository>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(ConsistencyConfig::default(), Duration::ZERO)
    }

    pub fn with(config: ConsistencyConfig, store_delay: Duration) -> Self {
        let store = Arc::new(MemoryPersistService::new());
        let cache = Arc::new(FaultyCache::default());
        let locks = Arc::new(FaultyLocks::default());
        let fail_commit = Arc::new(AtomicBool::new(false));
        let repo = Arc::new(CacheConsistencyUserRepository::new(
            Arc::new(SlowStore {
                inner: store.clone(),
                delay: store_delay,
                fail_commit: fail_commit.clone(),
            }),
            cache.clone(),
            locks.clone(),
            config,
        ));
        Self {
            store,
            cache,
            locks,
            fail_commit,
            repo,
        }
    }

    pub fn lock_config(&self) -> &LockConfig {
        &self.repo.config().lock
    }

    /// Whether the per-user lock for `id` is currently held
    pub async fn is_locked(&self, id: i64) -> bool {
        self.locks
            .get(&self.lock_config().namespace, &steward_core::lock_name(id))
            .await
            .unwrap()
            .is_some_and(|lock| lock.is_locked())
    }

    pub async fn insert(&self, external_id: &str, nickname: &str) -> i64 {
        self.store
            .user_insert(NewUser {
                external_id: external_id.to_string(),
                nickname: nickname.to_string(),
                avatar: String::new(),
            })
            .await
            .unwrap()
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Metrics recorder that keeps counter totals by name and labels, e.g.
/// `steward_user_logins_total{outcome=existing}`
#[derive(Default)]
pub struct CountingRecorder {
    counters: DashMap<String, Arc<AtomicU64>>,
}

impl CountingRecorder {
    pub fn count(&self, key: &str) -> u64 {
        self.counters
            .get(key)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn render(key: &Key) -> String {
        let labels: Vec<String> = key
            .labels()
            .map(|label| format!("{}={}", label.key(), label.value()))
            .collect();
        if labels.is_empty() {
            key.name().to_string()
        } else {
            format!("{}{{{}}}", key.name(), labels.join(","))
        }
    }
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let counter = self.counters.entry(Self::render(key)).or_default().clone();
        Counter::from_arc(counter)
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Run `test` on a current-thread runtime with `recorder` installed for this
/// thread only, so parallel tests do not see each other's metrics
pub fn with_recorder<F>(recorder: &CountingRecorder, test: F)
where
    F: std::future::Future<Output = ()>,
{
    metrics::with_local_recorder(recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(test)
    })
}
