//! Key/value operations backing counters and cursors.

use beacon_core::errors::StorageError;
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

pub fn get_int(conn: &Connection, key: &str) -> Result<Option<i64>, StorageError> {
    conn.query_row(
        "SELECT int_value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get::<_, Option<i64>>(0),
    )
    .optional()
    .map(Option::flatten)
    .map_err(to_storage_err)
}

pub fn set_int(conn: &Connection, key: &str, value: i64) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO kv_store (key, int_value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET int_value = excluded.int_value",
        params![key, value],
    )
    .map(|_| ())
    .map_err(to_storage_err)
}

/// Add `delta` to the integer at `key` (absent counts as 0) and return the new value.
pub fn add_int(conn: &Connection, key: &str, delta: i64) -> Result<i64, StorageError> {
    conn.query_row(
        "INSERT INTO kv_store (key, int_value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET int_value = COALESCE(int_value, 0) + excluded.int_value
         RETURNING int_value",
        params![key, delta],
        |row| row.get(0),
    )
    .map_err(to_storage_err)
}

pub fn get_text(conn: &Connection, key: &str) -> Result<Option<String>, StorageError> {
    conn.query_row(
        "SELECT text_value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .map(Option::flatten)
    .map_err(to_storage_err)
}

pub fn set_text(conn: &Connection, key: &str, value: Option<&str>) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO kv_store (key, text_value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET text_value = excluded.text_value",
        params![key, value],
    )
    .map(|_| ())
    .map_err(to_storage_err)
}

/// Delete every key not starting with `keep_prefix`.
pub fn delete_all_except(conn: &Connection, keep_prefix: &str) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM kv_store WHERE substr(key, 1, length(?1)) != ?1",
        params![keep_prefix],
    )
    .map_err(to_storage_err)
}
