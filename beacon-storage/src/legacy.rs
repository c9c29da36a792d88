//! Legacy store and its one-way migration into the event queue.
//!
//! Older releases kept JSON events in a separate SQLite file. On startup the
//! rows are drained oldest-first into the current queue. A cursor stored in
//! the current database is advanced in the same transaction as the inserts,
//! so concurrent migrators never duplicate or lose a row.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use beacon_core::constants::LEGACY_MIGRATION_BATCH;
use beacon_core::errors::StorageError;
use beacon_core::requests::QueueInsert;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{info, warn};

use crate::queries::kv_ops;
use crate::queue::EventQueue;
use crate::to_storage_err;

const CURSOR_KEY: &str = "legacy.cursor";

const LEGACY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    _data BLOB NOT NULL,
    _created INTEGER NOT NULL
);
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRow {
    pub id: i64,
    pub data: Vec<u8>,
    pub created_at: i64,
}

/// Handle on a legacy store file.
pub struct LegacyStore {
    conn: Connection,
    path: PathBuf,
}

impl LegacyStore {
    /// Open the legacy store if its file exists.
    pub fn open_existing(path: &Path) -> Result<Option<Self>, StorageError> {
        if !path.exists() {
            return Ok(None);
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .map_err(to_storage_err)?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(to_storage_err)?;
        conn.execute_batch(LEGACY_SCHEMA).map_err(to_storage_err)?;
        Ok(Some(Self {
            conn,
            path: path.to_path_buf(),
        }))
    }

    /// Create (or open) a legacy store file.
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(to_storage_err)?;
        conn.execute_batch(LEGACY_SCHEMA).map_err(to_storage_err)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn insert(&self, data: &[u8], created_at: i64) -> Result<i64, StorageError> {
        self.conn
            .execute(
                "INSERT INTO events (_data, _created) VALUES (?1, ?2)",
                params![data, created_at],
            )
            .map_err(to_storage_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Rows with id greater than `cursor`, oldest first.
    pub fn fetch_after(&self, cursor: i64, limit: usize) -> Result<Vec<LegacyRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT _id, _data, _created FROM events WHERE _id > ?1 ORDER BY _id ASC LIMIT ?2")
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![cursor, limit as i64], |row| {
                Ok(LegacyRow {
                    id: row.get(0)?,
                    data: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .map_err(to_storage_err)?;
        let collected = rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err);
        collected
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the connection and remove the file with its WAL/SHM siblings.
    pub fn delete(self) -> Result<(), StorageError> {
        let path = self.path.clone();
        self.conn
            .close()
            .map_err(|(_, e)| to_storage_err(e))?;
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut name = path.clone().into_os_string();
            name.push(suffix);
            let candidate = PathBuf::from(name);
            match std::fs::remove_file(&candidate) {
                Ok(()) => {}
                // Another process may have removed it first.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::Unavailable {
                        reason: format!("cannot delete {}: {e}", candidate.display()),
                    })
                }
            }
        }
        info!(path = %path.display(), "legacy store deleted");
        Ok(())
    }
}

/// Limits on one startup's migration work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationBounds {
    pub batch_size: usize,
    pub max_batches: usize,
    pub budget: Duration,
}

impl Default for MigrationBounds {
    fn default() -> Self {
        Self {
            batch_size: LEGACY_MIGRATION_BATCH,
            max_batches: 50,
            budget: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMigrationReport {
    pub batches: usize,
    pub migrated: usize,
    pub skipped: usize,
    /// The legacy store was fully drained and deleted.
    pub completed: bool,
}

/// Drain `legacy` into `queue`, converting each row with `convert`.
/// Rows `convert` rejects are counted as skipped and never retried.
pub fn migrate_legacy<F>(
    queue: &EventQueue,
    legacy: LegacyStore,
    bounds: MigrationBounds,
    convert: F,
) -> Result<LegacyMigrationReport, StorageError>
where
    F: Fn(&LegacyRow) -> Option<QueueInsert>,
{
    let started = Instant::now();
    let batch_size = bounds.batch_size.max(1);
    let mut report = LegacyMigrationReport::default();

    while report.batches < bounds.max_batches && started.elapsed() < bounds.budget {
        let mut fetched = 0usize;
        let mut skipped = 0usize;
        let inserted = queue.insert_within(|conn| {
            let cursor = kv_ops::get_int(conn, CURSOR_KEY)?.unwrap_or(0);
            let rows = legacy.fetch_after(cursor, batch_size)?;
            fetched = rows.len();
            let Some(last) = rows.last() else {
                return Ok(Vec::new());
            };
            kv_ops::set_int(conn, CURSOR_KEY, last.id)?;
            let converted: Vec<QueueInsert> = rows.iter().filter_map(&convert).collect();
            skipped = rows.len() - converted.len();
            Ok(converted)
        })?;

        if fetched > 0 {
            report.batches += 1;
        }
        report.migrated += inserted;
        report.skipped += skipped;
        if skipped > 0 {
            warn!(skipped, "legacy rows could not be converted");
        }

        if fetched < batch_size {
            legacy.delete()?;
            report.completed = true;
            info!(
                migrated = report.migrated,
                skipped = report.skipped,
                "legacy migration complete"
            );
            return Ok(report);
        }
    }

    info!(
        batches = report.batches,
        migrated = report.migrated,
        "legacy migration paused, will resume on next start"
    );
    Ok(report)
}

/// Current migration cursor (0 when nothing was migrated).
pub fn migration_cursor(queue: &EventQueue) -> Result<i64, StorageError> {
    queue
        .database()
        .with_conn(|conn| kv_ops::get_int(conn, CURSOR_KEY))
        .map(|c| c.unwrap_or(0))
}
