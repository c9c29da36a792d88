//! Storage-layer errors for SQLite operations.

use super::error_code::{self, ErrorCode};

/// Errors from the durable queue, counter store, and legacy store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("payload of {size} bytes exceeds the {limit} byte row ceiling")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("disk full, storage operations are suspended")]
    DiskFull,

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("lock error: {message}")]
    LockError { message: String },
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge { .. } => error_code::PAYLOAD_TOO_LARGE,
            Self::DiskFull => error_code::DISK_FULL,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
