//! Background reclamation of expired files.
//!
//! Each cycle selects records whose expiry is strictly in the past,
//! deletes their blob, then always deletes the row. A record ends either
//! reclaimed (blob and row removed) or as an orphaned row (blob missing or
//! undeletable, row removed anyway). Per-record failures are logged and
//! never stop the loop; a failed candidate query is retried next interval.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::cache::FileCache;
use crate::db::DbPool;
use crate::Result;

use super::metadata::{FileRecord, FileRepository};
use super::storage::FileStorage;

/// Default interval between sweep cycles.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Counts from one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired records selected.
    pub examined: usize,
    /// Blob and row both removed.
    pub reclaimed: usize,
    /// Row removed but the blob was missing or could not be deleted.
    pub orphaned: usize,
    /// Row delete failed; the record will be retried next cycle.
    pub failed: usize,
}

impl SweepReport {
    /// Rows actually removed from the metadata store.
    pub fn rows_removed(&self) -> usize {
        self.reclaimed + self.orphaned
    }
}

/// Terminal state of one swept record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Reclaimed,
    OrphanedRow,
    /// The row delete affected nothing (already gone) or failed.
    RowNotRemoved,
}

/// Expired-file sweeper.
#[derive(Debug, Clone)]
pub struct Sweeper {
    pool: DbPool,
    storage: FileStorage,
    cache: FileCache,
    interval: Duration,
}

/// Handle to a spawned sweeper task.
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish.
    ///
    /// A cycle in progress is allowed to complete.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.join.await {
            error!("Sweeper task ended abnormally: {}", e);
        }
    }
}

impl Sweeper {
    pub fn new(pool: DbPool, storage: FileStorage, cache: FileCache) -> Self {
        Self {
            pool,
            storage,
            cache,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Set the interval between cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the sweeper on its own task.
    pub fn spawn(self) -> SweeperHandle {
        let (stop, stop_rx) = watch::channel(false);
        let join = tokio::spawn(async move { self.run(stop_rx).await });
        SweeperHandle { stop, join }
    }

    /// Sweep on a fixed interval until `stop` flips to true or its sender is dropped.
    ///
    /// The first cycle runs immediately.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Starting expiry sweeper");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(report) if report.examined > 0 => info!(
                            examined = report.examined,
                            reclaimed = report.reclaimed,
                            orphaned = report.orphaned,
                            failed = report.failed,
                            "Sweep cycle complete, {} rows removed",
                            report.rows_removed()
                        ),
                        Ok(_) => debug!("Sweep cycle found no expired files"),
                        Err(e) => error!("Sweep cycle failed, retrying next interval: {}", e),
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    /// Run one sweep cycle against the current time.
    pub async fn run_once(&self) -> Result<SweepReport> {
        self.run_once_at(Utc::now()).await
    }

    /// Run one sweep cycle treating `now` as the current time.
    ///
    /// Fails only if the expired-record query itself fails. The query
    /// narrows the candidates and `Expiry::is_expired` decides.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let expired: Vec<FileRecord> = FileRepository::new(&self.pool)
            .list_expired(now)
            .await?
            .into_iter()
            .filter(|record| record.expires_at.is_expired(now))
            .collect();

        let mut report = SweepReport {
            examined: expired.len(),
            ..SweepReport::default()
        };

        for record in &expired {
            match self.reclaim(record).await {
                Outcome::Reclaimed => report.reclaimed += 1,
                Outcome::OrphanedRow => report.orphaned += 1,
                Outcome::RowNotRemoved => report.failed += 1,
            }
        }

        let purged = self.cache.purge_expired().await;
        if purged > 0 {
            debug!(purged, "Dropped expired cache entries");
        }

        Ok(report)
    }

    async fn reclaim(&self, record: &FileRecord) -> Outcome {
        let location = record.location();

        let blob_removed = match self.storage.delete(&location).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(file_id = record.id, path = %location, "Expired file already missing from disk");
                false
            }
            Err(e) => {
                warn!(file_id = record.id, path = %location, error = %e, "Failed to delete expired blob");
                false
            }
        };

        let row_removed = match FileRepository::new(&self.pool).delete(record.id).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(file_id = record.id, error = %e, "Failed to delete expired file record");
                false
            }
        };

        if !row_removed {
            return Outcome::RowNotRemoved;
        }

        self.cache.evict_file(record).await;
        debug!(file_id = record.id, owner_id = record.owner_id, blob_removed, "Reclaimed expired file");

        if blob_removed {
            Outcome::Reclaimed
        } else {
            Outcome::OrphanedRow
        }
    }
}
