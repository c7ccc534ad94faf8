//! Persistence traits for user records
//!
//! Point lookups and inserts go straight to the backend. Profile updates run
//! inside a caller-managed transaction so the consistency layer can decide,
//! after the row is changed but before it is committed, whether the change may
//! become visible.

use async_trait::async_trait;
use steward_common::Result;

use crate::model::{NewUser, ProfileUpdate, StorageMode, UserRecord};

/// User record persistence operations
#[async_trait]
pub trait UserPersistence: Send + Sync {
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> Result<()>;

    /// Find a user by id
    async fn user_find_by_id(&self, id: i64) -> Result<Option<UserRecord>>;

    /// Find a user by external id
    async fn user_find_by_external_id(&self, external_id: &str) -> Result<Option<UserRecord>>;

    /// Insert a new user and return its assigned id.
    ///
    /// Both timestamps are set to the same instant. A conflicting
    /// `external_id` fails with `StewardError::DuplicateKey`.
    async fn user_insert(&self, user: NewUser) -> Result<i64>;

    /// Open a transaction for profile updates
    async fn begin(&self) -> Result<Box<dyn UserTransaction>>;
}

/// A store transaction. Dropping it without `commit` discards its changes.
#[async_trait]
pub trait UserTransaction: Send {
    /// Update nickname and avatar of `update.id` and advance `updated_at`.
    ///
    /// Fails with `StewardError::UserNotFound` when no row matches.
    async fn user_update_profile(&mut self, update: &ProfileUpdate) -> Result<()>;

    /// Make the changes durable and visible
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard the changes
    async fn rollback(self: Box<Self>) -> Result<()>;
}
