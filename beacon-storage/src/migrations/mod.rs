//! Schema migrations using PRAGMA user_version.

pub mod v001_events;
pub mod v002_kv_store;

use beacon_core::errors::StorageError;
use rusqlite::Connection;

use crate::connection::writer::with_immediate_transaction;

/// Run all pending migrations. The version check happens under the write
/// lock, so processes starting together apply each migration once.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let migrations: &[(&str, u32)] = &[
        (v001_events::MIGRATION_SQL, 1),
        (v002_kv_store::MIGRATION_SQL, 2),
    ];

    with_immediate_transaction(conn, |tx| {
        let current_version = current_version(tx)?;
        for (sql, version) in migrations {
            if current_version < *version {
                tx.execute_batch(sql).map_err(|e| StorageError::MigrationFailed {
                    version: *version,
                    message: e.to_string(),
                })?;
                tx.pragma_update(None, "user_version", version)
                    .map_err(|e| StorageError::MigrationFailed {
                        version: *version,
                        message: e.to_string(),
                    })?;
                tracing::info!(version = version, "applied migration");
            }
        }
        Ok(())
    })
}

/// Get the current schema version.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| StorageError::MigrationFailed {
            version: 0,
            message: e.to_string(),
        })
}
