//! Durable local queue shared by every process of the host.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beacon_core::config::StorageConfig;
use beacon_core::errors::{BeaconResult, StorageError};
use beacon_core::event::{SendPolicy, StoreCategory};
use beacon_core::registry::{Handler, Module, Registry};
use beacon_core::requests::{FetchedBatch, QueueCommand, QueueInsert, QueueReply};
use rusqlite::Connection;
use tracing::{debug, error, warn};

use crate::connection::Database;
use crate::queries::event_ops;
use crate::now_millis;

/// Size bounds enforced by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueLimits {
    pub max_row_bytes: usize,
    pub max_stored_rows: usize,
}

impl From<&StorageConfig> for QueueLimits {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_row_bytes: config.max_row_bytes,
            max_stored_rows: config.max_stored_rows,
        }
    }
}

/// SQLite-backed FIFO of encoded events, ordered by row id.
///
/// Once SQLite reports the disk full, every operation fails fast with
/// `StorageError::DiskFull` for the rest of the process lifetime.
pub struct EventQueue {
    db: Arc<Database>,
    limits: QueueLimits,
    disabled: AtomicBool,
}

impl EventQueue {
    pub fn new(db: Arc<Database>, limits: QueueLimits) -> Self {
        Self {
            db,
            limits,
            disabled: AtomicBool::new(false),
        }
    }

    /// Open the queue database at `path`.
    pub fn open(path: &Path, config: &StorageConfig) -> Result<Self, StorageError> {
        let db = Database::open(path, config.busy_timeout_ms)?;
        Ok(Self::new(Arc::new(db), QueueLimits::from(config)))
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn limits(&self) -> QueueLimits {
        self.limits
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    fn guarded<T>(
        &self,
        op: &'static str,
        f: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        if self.is_disabled() {
            return Err(StorageError::DiskFull);
        }
        let result = f();
        if let Err(StorageError::DiskFull) = result {
            if !self.disabled.swap(true, Ordering::AcqRel) {
                error!(op, "disk full, queue operations are suspended for this process");
            }
        }
        result
    }

    /// Append a row. Rejects rows over the row ceiling, then evicts the
    /// oldest rows beyond the stored-row limit in the same transaction.
    pub fn insert(&self, row: QueueInsert) -> Result<i64, StorageError> {
        if row.data.len() > self.limits.max_row_bytes {
            warn!(
                size = row.data.len(),
                limit = self.limits.max_row_bytes,
                "rejecting oversized event"
            );
            return Err(StorageError::PayloadTooLarge {
                size: row.data.len(),
                limit: self.limits.max_row_bytes,
            });
        }
        let max_rows = self.limits.max_stored_rows;
        self.guarded("insert", || {
            self.db.with_write(|tx| {
                let id = event_ops::insert_row(tx, &row)?;
                let evicted = event_ops::trim_to(tx, max_rows)?;
                if evicted > 0 {
                    warn!(evicted, max_rows, "queue full, evicted oldest rows");
                }
                Ok(id)
            })
        })
    }

    /// Insert rows produced by `f`, which runs inside the same write
    /// transaction and may read or update other tables through the
    /// connection. Oversized rows are dropped. Returns the number inserted.
    pub fn insert_within<F>(&self, f: F) -> Result<usize, StorageError>
    where
        F: FnOnce(&Connection) -> Result<Vec<QueueInsert>, StorageError>,
    {
        let limits = self.limits;
        self.guarded("insert_within", || {
            self.db.with_write(|tx| {
                let rows = f(tx)?;
                let mut inserted = 0;
                for row in rows.iter().filter(|r| r.data.len() <= limits.max_row_bytes) {
                    event_ops::insert_row(tx, row)?;
                    inserted += 1;
                }
                event_ops::trim_to(tx, limits.max_stored_rows)?;
                Ok(inserted)
            })
        })
    }

    /// Oldest rows of `policy`, all from the category of the oldest such
    /// row, at most `limit` rows and stopping before `max_bytes` would be
    /// exceeded. The first row is always included.
    pub fn fetch_oldest(
        &self,
        policy: SendPolicy,
        limit: usize,
        max_bytes: usize,
    ) -> Result<FetchedBatch, StorageError> {
        let max_row_bytes = self.limits.max_row_bytes;
        self.guarded("fetch_oldest", || {
            self.db.with_write(|tx| {
                let purged = event_ops::delete_oversized(tx, max_row_bytes)?;
                if purged > 0 {
                    warn!(purged, "deleted illegal oversized rows");
                }
                let Some(category) = event_ops::oldest_category(tx, policy)? else {
                    return Ok(FetchedBatch::default());
                };
                let candidates = event_ops::select_oldest(tx, policy, category, limit)?;

                let mut batch = FetchedBatch {
                    category: Some(category),
                    ..FetchedBatch::default()
                };
                for row in candidates {
                    let size = row.data.len();
                    if !batch.rows.is_empty() && batch.total_bytes + size > max_bytes {
                        break;
                    }
                    batch.total_bytes += size;
                    batch.max_row_id = row.id;
                    batch.rows.push(row);
                }
                debug!(
                    ?policy,
                    ?category,
                    rows = batch.rows.len(),
                    bytes = batch.total_bytes,
                    "fetched batch"
                );
                Ok(batch)
            })
        })
    }

    /// Delete rows of `policy`/`category` up to and including `row_id`.
    /// Idempotent.
    pub fn delete_up_to(
        &self,
        row_id: i64,
        policy: SendPolicy,
        category: StoreCategory,
    ) -> Result<usize, StorageError> {
        self.guarded("delete_up_to", || {
            self.db
                .with_write(|tx| event_ops::delete_up_to(tx, row_id, policy, category))
        })
    }

    pub fn delete_all(&self) -> Result<usize, StorageError> {
        self.guarded("delete_all", || self.db.with_write(|tx| event_ops::delete_all(tx)))
    }

    /// Delete rows older than `older_than_days`.
    pub fn evict_stale(&self, older_than_days: u32) -> Result<usize, StorageError> {
        let now = now_millis();
        self.guarded("evict_stale", || {
            self.db
                .with_write(|tx| event_ops::delete_older_than(tx, older_than_days, now))
        })
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        self.guarded("count", || self.db.with_conn(event_ops::count_rows))
    }
}

impl Handler<QueueCommand, QueueReply> for EventQueue {
    fn handle(&self, command: QueueCommand) -> BeaconResult<QueueReply> {
        let reply = match command {
            QueueCommand::Insert(row) => QueueReply::Inserted(self.insert(row)?),
            QueueCommand::FetchOldest {
                policy,
                limit,
                max_bytes,
            } => QueueReply::Fetched(self.fetch_oldest(policy, limit, max_bytes)?),
            QueueCommand::DeleteUpTo {
                row_id,
                policy,
                category,
            } => QueueReply::Deleted(self.delete_up_to(row_id, policy, category)?),
            QueueCommand::DeleteAll => QueueReply::Deleted(self.delete_all()?),
            QueueCommand::EvictStale { older_than_days } => {
                QueueReply::Deleted(self.evict_stale(older_than_days)?)
            }
            QueueCommand::Count => QueueReply::Count(self.count()?),
        };
        Ok(reply)
    }
}

/// Registers the SQLite queue as the `QueueCommand -> QueueReply` provider.
pub struct StorageModule {
    queue: Arc<EventQueue>,
}

impl StorageModule {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }
}

impl Module for StorageModule {
    fn name(&self) -> &'static str {
        "sqlite-queue"
    }

    fn register_components(&self, registry: &mut Registry) {
        registry.register_handler::<QueueCommand, QueueReply>(self.queue.clone());
    }
}
