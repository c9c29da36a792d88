//! PRAGMA configuration applied to every connection.

use beacon_core::errors::StorageError;
use rusqlite::Connection;

/// WAL, NORMAL sync, in-memory temp store, and the configured busy timeout.
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u32) -> Result<(), StorageError> {
    // Busy timeout first: switching to WAL takes a lock another process may hold.
    conn.busy_timeout(std::time::Duration::from_millis(u64::from(busy_timeout_ms)))
        .map_err(|e| StorageError::SqliteError {
            message: format!("failed to set busy_timeout: {e}"),
        })?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(|e| StorageError::SqliteError {
        message: format!("failed to apply pragmas: {e}"),
    })
}

/// Verify that WAL mode is active.
pub fn verify_wal_mode(conn: &Connection) -> Result<bool, StorageError> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
