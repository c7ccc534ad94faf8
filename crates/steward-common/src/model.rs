//! Domain view of a user profile
//!
//! `User` is what callers see and what the cache holds. Timestamps are kept at
//! millisecond precision in UTC so a value read back from any store compares
//! equal to the one written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile as seen by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// Institution-issued identifier, unique and immutable
    pub external_id: String,
    pub avatar: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The profile has never been edited since creation
    pub is_new: bool,
}

impl User {
    /// Build the domain view, deriving `is_new` from the timestamps
    pub fn new(
        id: i64,
        external_id: impl Into<String>,
        avatar: impl Into<String>,
        nickname: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            external_id: external_id.into(),
            avatar: avatar.into(),
            nickname: nickname.into(),
            created_at,
            updated_at,
            is_new: created_at == updated_at,
        }
    }
}

/// Current instant truncated to millisecond precision
pub fn now_millis() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

/// Convert epoch milliseconds to a UTC instant, clamping out-of-range values to the epoch
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_user_is_new() {
        let now = now_millis();
        let user = User::new(1, "2021213001", "", "", now, now);
        assert!(user.is_new);

        let edited = User::new(
            1,
            "2021213001",
            "a.png",
            "Alice",
            now,
            now + chrono::Duration::milliseconds(1),
        );
        assert!(!edited.is_new);
    }

    #[test]
    fn test_user_serialization() {
        let now = from_millis(1_700_000_000_123);
        let user = User::new(42, "2021213001", "a.png", "Alice", now, now);
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"externalId\":\"2021213001\""));
        assert!(json.contains("\"isNew\":true"));

        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_now_millis_has_no_sub_millisecond_part() {
        let now = now_millis();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    proptest! {
        #[test]
        fn prop_is_new_iff_timestamps_equal(created in 0i64..4_000_000_000_000, delta in 0i64..1_000_000) {
            let created_at = from_millis(created);
            let updated_at = from_millis(created + delta);
            let user = User::new(7, "sid", "", "", created_at, updated_at);
            prop_assert_eq!(user.is_new, delta == 0);
            prop_assert!(user.updated_at >= user.created_at);
        }
    }
}
