use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::AccountSnapshot;

/// A live login, persisted as one JSON document per session.
///
/// The profile fields are copied from the account when the session is
/// created or refreshed and are not re-read on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The opaque identifier carried by the login token.
    pub session_id: String,
    /// The account this session belongs to.
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub telephone: String,
    pub email: String,
    pub avatar: Option<String>,
    /// Creation (or last refresh) time, epoch milliseconds.
    pub created_at: i64,
    /// `created_at` plus the session TTL, epoch milliseconds.
    pub expires_at: i64,
}

impl SessionRecord {
    /// Builds a record for `snapshot` that starts at `now` and lives for `ttl_ms`.
    pub fn new(session_id: String, snapshot: AccountSnapshot, now: i64, ttl_ms: i64) -> Self {
        Self {
            session_id,
            user_id: snapshot.user_id,
            username: snapshot.username,
            full_name: snapshot.full_name,
            telephone: snapshot.telephone,
            email: snapshot.email,
            avatar: snapshot.avatar,
            created_at: now,
            expires_at: now + ttl_ms,
        }
    }

    /// Whether the record is past its expiry at `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// What the auth gate hands to a protected handler.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// The token the request was admitted with.
    pub token: String,
    /// The session the token resolved to.
    pub session: SessionRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AccountSnapshot {
        AccountSnapshot {
            user_id: Uuid::nil(),
            username: "drummer1".to_string(),
            full_name: "Dee Drummer".to_string(),
            telephone: "0800123".to_string(),
            email: "dee@example.com".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn expiry_is_creation_plus_ttl() {
        let record = SessionRecord::new("s1".into(), snapshot(), 1_000, 2_629_800_000);
        assert_eq!(record.expires_at, 2_629_801_000);
        assert!(record.expires_at > record.created_at);
    }

    #[test]
    fn expiry_is_strict() {
        let record = SessionRecord::new("s1".into(), snapshot(), 1_000, 2_629_800_000);
        assert!(!record.is_expired_at(2_629_800_500));
        assert!(!record.is_expired_at(2_629_801_000));
        assert!(record.is_expired_at(2_629_802_000));
    }
}
