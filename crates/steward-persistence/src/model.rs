//! Domain model types for the persistence abstraction layer
//!
//! These types are used as inputs and return values of the persistence traits,
//! decoupled from specific storage backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub external_id: String,
    pub nickname: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload. `id` and both timestamps are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub external_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
}

impl NewUser {
    /// First-login provisioning payload: only the external id is known
    pub fn with_external_id(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            ..Default::default()
        }
    }
}

/// Typed partial update listing exactly the mutable profile fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub id: i64,
    pub nickname: String,
    pub avatar: String,
}

impl ProfileUpdate {
    pub fn new(id: i64, nickname: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            avatar: avatar.into(),
        }
    }
}

/// Storage mode for the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL via SeaORM)
    ExternalDb,
    /// Standalone in-memory storage (single node, no external DB)
    Standalone,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::Standalone => write!(f, "standalone"),
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_db" => Ok(StorageMode::ExternalDb),
            "standalone" => Ok(StorageMode::Standalone),
            _ => Err(format!("Invalid storage mode: {}", s)),
        }
    }
}
