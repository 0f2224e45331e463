use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::StoreError,
    models::{account::AccountSnapshot, session::SessionRecord},
    repositories::account::AccountDirectory,
};

const RECORD_EXTENSION: &str = "json";

struct Inner {
    dir: PathBuf,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
    // Held while replacing or deleting a record so a refresh cannot
    // resurrect a record deleted after it was read.
    writes: Mutex<()>,
}

/// File-per-session store.
///
/// Each record lives at `<dir>/<session_id>.json`. Records are written to a
/// hidden temp file first and then published, so a reader never sees a
/// half-written record under its real name.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Opens (and creates if needed) the sessions directory.
    pub async fn open(
        dir: impl Into<PathBuf>,
        ttl_ms: i64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!("✅ Session store ready at {}", dir.display());
        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                ttl_ms,
                clock,
                writes: Mutex::new(()),
            }),
        })
    }

    pub fn now_millis(&self) -> i64 {
        self.inner.clock.now_millis()
    }

    /// Maps an identifier to its file, refusing anything that could escape
    /// the directory.
    fn record_path(&self, session_id: &str) -> Option<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id.len() <= 64
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| {
            self.inner
                .dir
                .join(format!("{}.{}", session_id, RECORD_EXTENSION))
        })
    }

    fn temp_path(&self, session_id: &str) -> PathBuf {
        self.inner
            .dir
            .join(format!(".{}.{}.tmp", session_id, Uuid::new_v4().simple()))
    }

    async fn write_temp(&self, record: &SessionRecord) -> Result<PathBuf, StoreError> {
        let body = sonic_rs::to_string(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let temp = self.temp_path(&record.session_id);
        if let Err(e) = tokio::fs::write(&temp, body.as_bytes()).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(temp)
    }

    /// Persists a brand-new session for `snapshot`.
    ///
    /// The record is published with a hard link, which fails instead of
    /// replacing an existing file.
    pub async fn create(&self, snapshot: AccountSnapshot) -> Result<SessionRecord, StoreError> {
        let session_id = Uuid::new_v4().simple().to_string();
        let record = SessionRecord::new(
            session_id.clone(),
            snapshot,
            self.now_millis(),
            self.inner.ttl_ms,
        );

        self.publish(&record).await?;
        tracing::debug!("Session created: {}", session_id);
        Ok(record)
    }

    /// Writes `record` under its identifier unless a record already exists
    /// there.
    async fn publish(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let path = self
            .record_path(&record.session_id)
            .ok_or_else(|| StoreError::Collision(record.session_id.clone()))?;
        let temp = self.write_temp(record).await?;

        let published = tokio::fs::hard_link(&temp, &path).await;
        let _ = tokio::fs::remove_file(&temp).await;
        match published {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::error!("❌ Session id collision: {}", record.session_id);
                Err(StoreError::Collision(record.session_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reads a record with the precise reason on failure.
    pub async fn load(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        let path = self.record_path(session_id).ok_or(StoreError::NotFound)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let record: SessionRecord =
            sonic_rs::from_slice(&body).map_err(|e| StoreError::Corrupt {
                id: session_id.to_string(),
                reason: e.to_string(),
            })?;

        if record.session_id != session_id || record.expires_at <= record.created_at {
            return Err(StoreError::Corrupt {
                id: session_id.to_string(),
                reason: "record does not match its identifier".to_string(),
            });
        }

        Ok(record)
    }

    /// Returns the live record for `session_id`.
    ///
    /// Unreadable and corrupt records are reported as `NotFound`.
    pub async fn get(&self, session_id: &str) -> Result<SessionRecord, StoreError> {
        match self.load(session_id).await {
            Ok(record) => Ok(record),
            Err(StoreError::NotFound) => Err(StoreError::NotFound),
            Err(e) => {
                tracing::warn!("⚠️ Treating unreadable session as missing: {}", e);
                Err(StoreError::NotFound)
            }
        }
    }

    /// Re-derives the profile from the account and restarts the TTL,
    /// keeping the identifier. The new expiry is always later than the
    /// current one, even if the clock has not moved or has stepped back.
    ///
    /// A session whose account has disappeared is deleted and reported as
    /// `NotFound`, and so is one deleted while the refresh was running.
    pub async fn refresh(
        &self,
        session_id: &str,
        accounts: &dyn AccountDirectory,
    ) -> Result<SessionRecord, StoreError> {
        let current = self.get(session_id).await?;

        let account = match accounts.find_account_by_id(current.user_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::warn!(
                    "⚠️ Account {} no longer exists, dropping session {}",
                    current.user_id,
                    session_id
                );
                self.delete(session_id).await;
                return Err(StoreError::NotFound);
            }
            Err(e) => {
                return Err(StoreError::Io(std::io::Error::other(format!(
                    "account lookup failed: {}",
                    e
                ))));
            }
        };

        let start = self
            .now_millis()
            .max(current.expires_at - self.inner.ttl_ms + 1);
        let record = SessionRecord::new(
            current.session_id,
            account.snapshot(),
            start,
            self.inner.ttl_ms,
        );
        self.replace(&record).await?;
        tracing::debug!("Session refreshed: {}", session_id);
        Ok(record)
    }

    /// Atomically overwrites an existing record under its identifier.
    async fn replace(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let path = self
            .record_path(&record.session_id)
            .ok_or(StoreError::NotFound)?;
        let temp = self.write_temp(record).await?;

        let _writes = self.inner.writes.lock().await;
        let replaced = match tokio::fs::try_exists(&path).await {
            Ok(true) => tokio::fs::rename(&temp, &path).await.map_err(StoreError::from),
            Ok(false) => Err(StoreError::NotFound),
            Err(e) => Err(e.into()),
        };
        if replaced.is_err() {
            let _ = tokio::fs::remove_file(&temp).await;
        }
        replaced
    }

    /// Removes a record. Removing a missing record is not an error, and any
    /// other failure is only logged.
    pub async fn delete(&self, session_id: &str) {
        let Some(path) = self.record_path(session_id) else {
            return;
        };
        let _writes = self.inner.writes.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Session deleted: {}", session_id),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Session already gone: {}", session_id)
            }
            Err(e) => tracing::error!("❌ Failed to delete session {}: {}", session_id, e),
        }
    }

    /// Identifiers of every stored record.
    pub async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.inner.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if stem.starts_with('.') || self.record_path(stem).is_none() {
                continue;
            }
            ids.push(stem.to_string());
        }
        Ok(ids)
    }
}
