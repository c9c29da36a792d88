//! # beacon-storage
//!
//! SQLite persistence for the Beacon event pipeline.
//! Every process opens its own connection on the shared database file;
//! WAL, `busy_timeout`, and `BEGIN IMMEDIATE` make that safe.

pub mod connection;
pub mod counters;
pub mod legacy;
pub mod lock;
pub mod migrations;
pub mod queries;
pub mod queue;

pub use connection::Database;
pub use counters::PersistentCounters;
pub use legacy::{LegacyMigrationReport, LegacyStore, MigrationBounds};
pub use lock::{InstanceLock, SenderLock};
pub use queue::{EventQueue, QueueLimits, StorageModule};

use beacon_core::errors::StorageError;

/// Map a rusqlite error into a `StorageError`, surfacing `SQLITE_FULL`.
pub(crate) fn to_storage_err(e: rusqlite::Error) -> StorageError {
    if is_disk_full(&e) {
        return StorageError::DiskFull;
    }
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

pub(crate) fn is_disk_full(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::DiskFull
    )
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
