//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! Implements `UserPersistence` on a SeaORM `DatabaseConnection`. Profile
//! updates run on a `DatabaseTransaction` handed back to the caller, which
//! rolls back on drop if never committed.

use async_trait::async_trait;
use sea_orm::{prelude::Expr, *};
use steward_common::model::{from_millis, now_millis};
use steward_common::{Result, StewardError};
use tracing::debug;

use crate::entity::users;
use crate::model::{NewUser, ProfileUpdate, StorageMode, UserRecord};
use crate::traits::{UserPersistence, UserTransaction};

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection` and implements the persistence traits
/// with direct queries on the `users` table.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl From<users::Model> for UserRecord {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            external_id: model.external_id,
            nickname: model.nickname,
            avatar: model.avatar,
            created_at: from_millis(model.created_at),
            updated_at: from_millis(model.updated_at),
        }
    }
}

fn db_error(err: DbErr) -> StewardError {
    StewardError::DatabaseError(err.to_string())
}

/// Unique-key violations on insert can only come from `external_id`
fn insert_error(err: DbErr, external_id: &str) -> StewardError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            StewardError::DuplicateKey(external_id.to_string())
        }
        _ => db_error(err),
    }
}

#[async_trait]
impl UserPersistence for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> Result<()> {
        // Execute a simple query to verify connectivity
        users::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn user_find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(model.map(UserRecord::from))
    }

    async fn user_find_by_external_id(&self, external_id: &str) -> Result<Option<UserRecord>> {
        let model = users::Entity::find()
            .filter(users::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
            .map_err(db_error)?;
        Ok(model.map(UserRecord::from))
    }

    async fn user_insert(&self, user: NewUser) -> Result<i64> {
        let now = now_millis().timestamp_millis();
        let external_id = user.external_id.clone();

        let entity = users::ActiveModel {
            external_id: Set(user.external_id),
            nickname: Set(user.nickname),
            avatar: Set(user.avatar),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = users::Entity::insert(entity)
            .exec(&self.db)
            .await
            .map_err(|e| insert_error(e, &external_id))?;

        debug!(uid = result.last_insert_id, external_id = %external_id, "User inserted");
        Ok(result.last_insert_id)
    }

    async fn begin(&self) -> Result<Box<dyn UserTransaction>> {
        let txn = self.db.begin().await.map_err(db_error)?;
        Ok(Box::new(ExternalDbTransaction { txn }))
    }
}

/// Profile update transaction on the external database
pub struct ExternalDbTransaction {
    txn: DatabaseTransaction,
}

#[async_trait]
impl UserTransaction for ExternalDbTransaction {
    async fn user_update_profile(&mut self, update: &ProfileUpdate) -> Result<()> {
        let now = now_millis().timestamp_millis();

        // updated_at must move forward even within the creation millisecond
        let result = users::Entity::update_many()
            .col_expr(users::Column::Nickname, Expr::value(update.nickname.clone()))
            .col_expr(users::Column::Avatar, Expr::value(update.avatar.clone()))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::cust_with_values("GREATEST(?, updated_at + 1)", [now]),
            )
            .filter(users::Column::Id.eq(update.id))
            .exec(&self.txn)
            .await
            .map_err(db_error)?;

        if result.rows_affected == 0 {
            return Err(StewardError::UserNotFound(update.id.to_string()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.txn.commit().await.map_err(db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.txn.rollback().await.map_err(db_error)
    }
}
