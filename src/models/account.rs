use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a user account.
#[derive(Clone, Debug)]
pub struct Account {
    /// The unique identifier for the account.
    pub id: Uuid,
    /// The account's login name.
    pub username: String,
    /// The user's full name.
    pub full_name: String,
    /// The user's telephone number.
    pub telephone: String,
    /// The user's email address.
    pub email: String,
    /// Reference to the uploaded avatar, if any.
    pub avatar: Option<String>,
    /// The user's hashed password.
    pub password: String,
    /// The timestamp when the account was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// The profile fields copied into a session.
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            user_id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            telephone: self.telephone.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Denormalized profile captured into a session record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub telephone: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// A validated registration, password already hashed.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub username: String,
    pub full_name: String,
    pub telephone: String,
    pub email: String,
    pub avatar: Option<String>,
    pub password_hash: String,
}
