use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{error::StoreError, repositories::session::SessionStore};

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub evicted: usize,
    pub skipped: usize,
}

/// Periodically evicts expired sessions from the store.
#[derive(Clone)]
pub struct ExpirySweeper {
    store: SessionStore,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: SessionStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Runs a single pass over every stored record.
    ///
    /// Records that cannot be read or parsed are left in place; only
    /// successfully parsed records past their expiry are deleted.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let ids = match self.store.list_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("❌ Failed to list sessions: {}", e);
                return report;
            }
        };

        let now = self.store.now_millis();
        for id in ids {
            report.scanned += 1;
            match self.store.load(&id).await {
                Ok(record) if record.is_expired_at(now) => {
                    self.store.delete(&id).await;
                    report.evicted += 1;
                }
                Ok(_) => {}
                // Logged out or swept concurrently.
                Err(StoreError::NotFound) => {}
                Err(e) => {
                    tracing::warn!("⚠️ Skipping session {}: {}", id, e);
                    report.skipped += 1;
                }
            }
        }

        report
    }

    /// Spawns the sweep loop. It stops between cycles once `shutdown` is
    /// cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("🧹 Session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = self.sweep_once().await;
                        if report.evicted > 0 || report.skipped > 0 {
                            tracing::info!(
                                "🧹 Session sweep: scanned={} evicted={} skipped={}",
                                report.scanned,
                                report.evicted,
                                report.skipped
                            );
                        } else {
                            tracing::trace!("Session sweep: scanned={}", report.scanned);
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::account::AccountSnapshot;
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    const TTL: i64 = 2_629_800_000;

    fn snapshot() -> AccountSnapshot {
        AccountSnapshot {
            user_id: Uuid::new_v4(),
            username: "guitar1".to_string(),
            full_name: "Gil Guitar".to_string(),
            telephone: "0822222".to_string(),
            email: "gil@example.com".to_string(),
            avatar: None,
        }
    }

    async fn setup(now: i64) -> (TempDir, ManualClock, SessionStore) {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(now);
        let store = SessionStore::open(dir.path(), TTL, Arc::new(clock.clone()))
            .await
            .unwrap();
        (dir, clock, store)
    }

    #[tokio::test]
    async fn keeps_sessions_before_expiry() {
        let (_dir, clock, store) = setup(1_000).await;
        let record = store.create(snapshot()).await.unwrap();
        let sweeper = ExpirySweeper::new(store.clone(), Duration::from_secs(3));

        clock.set(2_629_800_500);
        let report = sweeper.sweep_once().await;

        assert_eq!(report, SweepReport { scanned: 1, evicted: 0, skipped: 0 });
        assert!(store.get(&record.session_id).await.is_ok());
    }

    #[tokio::test]
    async fn evicts_sessions_after_expiry() {
        let (_dir, clock, store) = setup(1_000).await;
        let record = store.create(snapshot()).await.unwrap();
        let sweeper = ExpirySweeper::new(store.clone(), Duration::from_secs(3));

        clock.set(2_629_802_000);
        let report = sweeper.sweep_once().await;

        assert_eq!(report, SweepReport { scanned: 1, evicted: 1, skipped: 0 });
        assert!(store.get(&record.session_id).await.is_err());
    }

    #[tokio::test]
    async fn corrupt_records_are_skipped_not_deleted() {
        let (dir, clock, store) = setup(1_000).await;
        tokio::fs::write(dir.path().join("garbled.json"), b"\x00\x01")
            .await
            .unwrap();
        let sweeper = ExpirySweeper::new(store.clone(), Duration::from_secs(3));

        clock.set(i64::MAX / 2);
        let report = sweeper.sweep_once().await;

        assert_eq!(report.skipped, 1);
        assert!(dir.path().join("garbled.json").exists());
    }

    #[tokio::test]
    async fn spawned_loop_evicts_within_a_few_intervals_and_stops() {
        let (_dir, clock, store) = setup(1_000).await;
        let record = store.create(snapshot()).await.unwrap();
        let shutdown = CancellationToken::new();
        let handle = ExpirySweeper::new(store.clone(), Duration::from_millis(20))
            .spawn(shutdown.clone());

        clock.set(2_629_802_000);
        let mut evicted = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if store.get(&record.session_id).await.is_err() {
                evicted = true;
                break;
            }
        }
        assert!(evicted);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
