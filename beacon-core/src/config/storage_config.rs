use serde::{Deserialize, Serialize};

use super::defaults;
use crate::constants::{MAX_RETENTION_DAYS, MIN_RETENTION_DAYS};

/// Durable queue configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Queue database file name, relative to the tracker data dir.
    pub db_filename: String,
    /// Legacy store file name, relative to the tracker data dir.
    pub legacy_db_filename: String,
    /// Rows larger than this are rejected on insert and purged on fetch.
    pub max_row_bytes: usize,
    /// Byte ceiling for one fetched batch.
    pub max_batch_bytes: usize,
    /// Oldest rows beyond this count are evicted on insert.
    pub max_stored_rows: usize,
    /// Rows older than this are swept. Clamped to 3..=30 at use.
    pub retention_days: u32,
    pub busy_timeout_ms: u32,
    /// Legacy migration bounds per startup.
    pub legacy_max_batches: usize,
    pub legacy_budget_ms: u64,
}

impl StorageConfig {
    pub fn effective_retention_days(&self) -> u32 {
        self.retention_days.clamp(MIN_RETENTION_DAYS, MAX_RETENTION_DAYS)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_filename: defaults::DEFAULT_DB_FILENAME.to_string(),
            legacy_db_filename: defaults::DEFAULT_LEGACY_DB_FILENAME.to_string(),
            max_row_bytes: defaults::DEFAULT_MAX_ROW_BYTES,
            max_batch_bytes: defaults::DEFAULT_MAX_BATCH_BYTES,
            max_stored_rows: defaults::DEFAULT_MAX_STORED_ROWS,
            retention_days: defaults::DEFAULT_RETENTION_DAYS,
            busy_timeout_ms: defaults::DEFAULT_BUSY_TIMEOUT_MS,
            legacy_max_batches: defaults::DEFAULT_LEGACY_MAX_BATCHES,
            legacy_budget_ms: defaults::DEFAULT_LEGACY_BUDGET_MS,
        }
    }
}
