//! Queue row operations: insert, trim, fetch, delete, sweep.

use beacon_core::errors::StorageError;
use beacon_core::event::{SendPolicy, StoreCategory};
use beacon_core::requests::{QueueInsert, QueueRow};
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Insert one row, returning its id.
pub fn insert_row(conn: &Connection, row: &QueueInsert) -> Result<i64, StorageError> {
    conn.prepare_cached(
        "INSERT INTO events (category, policy, data, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .and_then(|mut stmt| {
        stmt.execute(params![
            row.category.as_i64(),
            row.policy.as_i64(),
            row.data,
            row.created_at
        ])
    })
    .map_err(to_storage_err)?;
    Ok(conn.last_insert_rowid())
}

/// Delete the oldest rows beyond `max_rows`. Returns the number removed.
pub fn trim_to(conn: &Connection, max_rows: usize) -> Result<usize, StorageError> {
    let total = count_rows(conn)?;
    if total <= max_rows {
        return Ok(0);
    }
    let excess = (total - max_rows) as i64;
    conn.execute(
        "DELETE FROM events WHERE id IN (SELECT id FROM events ORDER BY id ASC LIMIT ?1)",
        params![excess],
    )
    .map_err(to_storage_err)
}

pub fn count_rows(conn: &Connection) -> Result<usize, StorageError> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .map_err(to_storage_err)?;
    Ok(n as usize)
}

/// Remove stored rows whose payload exceeds `max_row_bytes`.
pub fn delete_oversized(conn: &Connection, max_row_bytes: usize) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM events WHERE length(data) > ?1",
        params![max_row_bytes as i64],
    )
    .map_err(to_storage_err)
}

/// Category of the oldest row with the given policy.
pub fn oldest_category(
    conn: &Connection,
    policy: SendPolicy,
) -> Result<Option<StoreCategory>, StorageError> {
    conn.query_row(
        "SELECT category FROM events WHERE policy = ?1 ORDER BY id ASC LIMIT 1",
        params![policy.as_i64()],
        |row| row.get::<_, i64>(0),
    )
    .optional()
    .map(|c| c.map(StoreCategory::from_i64))
    .map_err(to_storage_err)
}

/// Oldest rows of one policy and category, in id order, at most `limit`.
pub fn select_oldest(
    conn: &Connection,
    policy: SendPolicy,
    category: StoreCategory,
    limit: usize,
) -> Result<Vec<QueueRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, category, policy, data, created_at FROM events
             WHERE policy = ?1 AND category = ?2
             ORDER BY id ASC LIMIT ?3",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(
            params![policy.as_i64(), category.as_i64(), limit as i64],
            |row| {
                Ok(QueueRow {
                    id: row.get(0)?,
                    category: StoreCategory::from_i64(row.get(1)?),
                    policy: SendPolicy::from_i64(row.get(2)?).unwrap_or(SendPolicy::Batch),
                    data: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .map_err(to_storage_err)?;
    let collected = rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err);
    collected
}

/// Delete every row of `policy` and `category` with id `<= row_id`.
pub fn delete_up_to(
    conn: &Connection,
    row_id: i64,
    policy: SendPolicy,
    category: StoreCategory,
) -> Result<usize, StorageError> {
    conn.execute(
        "DELETE FROM events WHERE id <= ?1 AND policy = ?2 AND category = ?3",
        params![row_id, policy.as_i64(), category.as_i64()],
    )
    .map_err(to_storage_err)
}

pub fn delete_all(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM events", []).map_err(to_storage_err)
}

/// Delete rows created more than `days` before `now_millis`.
pub fn delete_older_than(
    conn: &Connection,
    days: u32,
    now_millis: i64,
) -> Result<usize, StorageError> {
    let cutoff = now_millis - i64::from(days) * MILLIS_PER_DAY;
    conn.execute("DELETE FROM events WHERE created_at < ?1", params![cutoff])
        .map_err(to_storage_err)
}
