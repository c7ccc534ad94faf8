//! Error types and error codes for Steward
//!
//! This module defines:
//! - `StewardError`: Application-specific error enum
//! - `ErrorCode`: Structured error codes for callers that render failures

use serde::{Deserialize, Serialize};

/// Result alias used across the Steward crates
pub type Result<T> = std::result::Result<T, StewardError>;

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum StewardError {
    #[error("user '{0}' not exist")]
    UserNotFound(String),

    #[error("duplicate user: {0}")]
    DuplicateKey(String),

    #[error("lock '{0}' unavailable: {1}")]
    LockUnavailable(String, String),

    #[error("lock error: {0}")]
    LockError(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("invalid external id or secret")]
    InvalidCredentials,

    #[error("identity provider error: {0}")]
    IdentityError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl StewardError {
    /// Error code reported to callers for this error
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            StewardError::UserNotFound(_) => USER_NOT_FOUND,
            StewardError::DuplicateKey(_) => DUPLICATE_USER,
            StewardError::LockUnavailable(..) => LOCK_UNAVAILABLE,
            StewardError::InvalidCredentials => INVALID_CREDENTIALS,
            StewardError::IdentityError(_) => IDENTITY_PROVIDER_ERROR,
            StewardError::DatabaseError(_) | StewardError::CacheError(_) => DATA_ACCESS_ERROR,
            StewardError::LockError(_)
            | StewardError::ConfigError(_)
            | StewardError::InternalError(_) => SERVER_ERROR,
        }
    }

    /// Whether the failure is the caller's concern ("wrong credentials",
    /// "no such user") rather than a system failure ("service unavailable").
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            StewardError::UserNotFound(_)
                | StewardError::DuplicateKey(_)
                | StewardError::InvalidCredentials
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StewardError::UserNotFound(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StewardError::DuplicateKey(_))
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const USER_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "user not found",
};

pub const DUPLICATE_USER: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "user already exist",
};

pub const INVALID_CREDENTIALS: ErrorCode<'static> = ErrorCode {
    code: 20006,
    message: "invalid external id or secret",
};

pub const LOCK_UNAVAILABLE: ErrorCode<'static> = ErrorCode {
    code: 23003,
    message: "lock unavailable",
};

pub const IDENTITY_PROVIDER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 23004,
    message: "identity provider error",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
