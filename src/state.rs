use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::crypto::token::TokenCodec;
use crate::error::{AppError, Result};
use crate::repositories::account::{AccountDirectory, MemoryAccountDirectory, PgAccountDirectory};
use crate::repositories::session::SessionStore;
use crate::services::sweeper::ExpirySweeper;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// Signs and verifies login tokens.
    pub tokens: TokenCodec,
    /// The session records.
    pub sessions: SessionStore,
    /// The account collaborator.
    pub accounts: Arc<dyn AccountDirectory>,
}

impl AppState {
    /// Creates a new `AppState` from the configuration.
    ///
    /// Accounts live in PostgreSQL when `DATABASE_URL` is set and in memory
    /// otherwise.
    pub async fn new(config: &Config) -> Result<Self> {
        let accounts: Arc<dyn AccountDirectory> = match &config.database_url {
            Some(url) => {
                let pool = crate::db::create_pool(url)?;
                tracing::info!("✅ PostgreSQL pool initialized");
                let directory = PgAccountDirectory::new(pool);
                directory.ensure_schema().await?;
                Arc::new(directory)
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL not set, accounts are kept in memory");
                Arc::new(MemoryAccountDirectory::new())
            }
        };

        Self::with_parts(config.clone(), accounts, Arc::new(SystemClock)).await
    }

    /// Builds the state around an explicit account directory and clock.
    pub async fn with_parts(
        config: Config,
        accounts: Arc<dyn AccountDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let tokens = TokenCodec::new(config.token_secret.as_bytes())?;

        let sessions = SessionStore::open(&config.sessions_dir, config.session_ttl_ms, clock)
            .await
            .map_err(|e| AppError::Configuration(format!("Sessions directory unusable: {}", e)))?;

        Ok(AppState {
            config,
            tokens,
            sessions,
            accounts,
        })
    }

    /// The sweeper for this state's session store.
    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(self.sessions.clone(), self.config.sweep_interval)
    }
}
