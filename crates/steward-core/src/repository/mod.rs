//! User repository
//!
//! `find_by_id` and `update_profile` go through the consistency coordinator.
//! `find_by_external_id` and `create` read and write the store directly: a
//! login that just created a user must see it on the next read.

mod consistency;
mod gate;

use async_trait::async_trait;
use steward_common::{Result, User};
use steward_persistence::{NewUser, ProfileUpdate, UserRecord};

pub use consistency::CacheConsistencyUserRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Current user for `id`, served from the cache when present
    async fn find_by_id(&self, id: i64) -> Result<User>;

    /// Change nickname and avatar, invalidating the cached entry before the
    /// change is committed
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<()>;

    /// Store lookup by external id, never cached
    async fn find_by_external_id(&self, external_id: &str) -> Result<User>;

    /// Insert a user and return its id. A taken external id fails with
    /// `StewardError::DuplicateKey`.
    async fn create(&self, user: NewUser) -> Result<i64>;
}

/// Name of the per-user lock. Every process derives the same name for an id.
pub fn lock_name(id: i64) -> String {
    format!("user:mutex:{}", id)
}

/// Domain view of a stored row
pub fn to_domain(record: UserRecord) -> User {
    User::new(
        record.id,
        record.external_id,
        record.avatar,
        record.nickname,
        record.created_at,
        record.updated_at,
    )
}
