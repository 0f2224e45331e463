use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::Pool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::account::{Account, NewAccount},
};

/// Where accounts live. The session core only needs these lookups.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Finds an account by its ID.
    async fn find_account_by_id(&self, user_id: Uuid) -> Result<Option<Account>>;

    /// Finds an account by its username.
    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Stores a new account. A taken username is a `Conflict`.
    async fn insert_account(&self, account: NewAccount) -> Result<Account>;
}

const ACCOUNT_COLUMNS: &str =
    "id, username, full_name, telephone, email, avatar, password, created_at, updated_at";

/// A helper function to map a `tokio_postgres::Row` to an `Account`.
fn row_to_account(row: &Row) -> Result<Account> {
    let column = |name: &str| AppError::MissingData(name.to_string());
    Ok(Account {
        id: row.try_get("id").map_err(|_| column("id"))?,
        username: row.try_get("username").map_err(|_| column("username"))?,
        full_name: row.try_get("full_name").map_err(|_| column("full_name"))?,
        telephone: row.try_get("telephone").map_err(|_| column("telephone"))?,
        email: row.try_get("email").map_err(|_| column("email"))?,
        avatar: row.try_get("avatar").map_err(|_| column("avatar"))?,
        password: row.try_get("password").map_err(|_| column("password"))?,
        created_at: row.try_get("created_at").map_err(|_| column("created_at"))?,
        updated_at: row.try_get("updated_at").map_err(|_| column("updated_at"))?,
    })
}

/// Accounts stored in PostgreSQL. Every query is parameterized.
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: Pool,
}

impl PgAccountDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates the `users` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id UUID PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    full_name TEXT NOT NULL,
                    telephone TEXT NOT NULL,
                    email TEXT NOT NULL,
                    avatar TEXT,
                    password TEXT NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            )
            .await?;
        tracing::info!("✅ users table ready");
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn find_account_by_id(&self, user_id: Uuid) -> Result<Option<Account>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {} FROM users WHERE id = $1", ACCOUNT_COLUMNS).as_str(),
                &[&user_id],
            )
            .await?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {} FROM users WHERE username = $1", ACCOUNT_COLUMNS).as_str(),
                &[&username],
            )
            .await?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        let row = client
            .query_opt(
                format!(
                    r#"
                    INSERT INTO users (id, username, full_name, telephone, email, avatar, password)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (username) DO NOTHING
                    RETURNING {}
                    "#,
                    ACCOUNT_COLUMNS
                )
                .as_str(),
                &[
                    &id,
                    &account.username,
                    &account.full_name,
                    &account.telephone,
                    &account.email,
                    &account.avatar,
                    &account.password_hash,
                ],
            )
            .await?
            .ok_or_else(|| AppError::Conflict("This username is already in use".to_string()))?;
        row_to_account(&row)
    }
}

/// Accounts kept in process memory, used when no database is configured.
#[derive(Clone, Default)]
pub struct MemoryAccountDirectory {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops an account, leaving any of its sessions behind.
    pub async fn remove(&self, user_id: Uuid) -> Option<Account> {
        self.accounts.write().await.remove(&user_id)
    }

    /// Replaces the profile fields of an existing account.
    pub async fn update<F>(&self, user_id: Uuid, edit: F) -> Option<Account>
    where
        F: FnOnce(&mut Account) + Send,
    {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&user_id)?;
        edit(account);
        account.updated_at = Utc::now();
        Some(account.clone())
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn find_account_by_id(&self, user_id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&user_id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.username == account.username) {
            return Err(AppError::Conflict(
                "This username is already in use".to_string(),
            ));
        }

        let now = Utc::now();
        let stored = Account {
            id: Uuid::new_v4(),
            username: account.username,
            full_name: account.full_name,
            telephone: account.telephone,
            email: account.email,
            avatar: account.avatar,
            password: account.password_hash,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }
}
