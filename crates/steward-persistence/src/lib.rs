//! Steward Persistence - User record storage
//!
//! This crate provides:
//! - SeaORM entity definition for the `users` table
//! - Persistence trait abstractions with caller-managed transactions
//! - An external database backend (MySQL/PostgreSQL via SeaORM)
//! - A standalone in-memory backend for single-node deployments and tests

pub mod embedded;
pub mod entity;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export persistence traits
pub use traits::{UserPersistence, UserTransaction};

// Re-export SQL backend
pub use sql::ExternalDbPersistService;

// Re-export standalone backend
pub use embedded::{MemoryPersistService, StoreStats};

// Re-export model types
pub use model::{NewUser, ProfileUpdate, StorageMode, UserRecord};
