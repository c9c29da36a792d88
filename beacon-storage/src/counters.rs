//! Process-shared persistent counters and identifiers.
//!
//! Everything lives in the `kv_store` table. Read-modify-write operations
//! run under `BEGIN IMMEDIATE`, so concurrent processes observe each
//! increment exactly once and converge on one lazily generated id.

use std::sync::Arc;

use beacon_core::errors::StorageError;
use beacon_core::event::{EventSequenceId, EventType};

use crate::connection::Database;
use crate::queries::kv_ops;

const KEY_GLOBAL_SEQUENCE: &str = "seq.global";
const KEY_SESSION_ID: &str = "id.session";
const KEY_DEVICE_ID: &str = "id.device";
const KEY_USER_ID: &str = "user.id";
const KEY_USER_KEY: &str = "user.key";
const KEY_LATEST_USER_ID: &str = "user.latest_non_null";
const KEY_LATEST_PAUSE_TIME: &str = "session.latest_pause";
const KEY_ACTIVITY_COUNT: &str = "session.activity_count";
const KEY_VISIT_SENT: &str = "session.visit_sent";
const KEY_CELLULAR_DAY: &str = "cellular.day";
const KEY_CELLULAR_BYTES: &str = "cellular.bytes";

/// Keys under this prefix survive `wipe`.
pub const RESERVED_PREFIX: &str = "legacy.";

fn sequence_key(event_type: EventType) -> String {
    format!("seq.{}", event_type.as_str())
}

pub struct PersistentCounters {
    db: Arc<Database>,
}

impl PersistentCounters {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Increment and return the global and per-type sequence numbers.
    /// Both start at 1.
    pub fn get_and_increment(&self, event_type: EventType) -> Result<EventSequenceId, StorageError> {
        let type_key = sequence_key(event_type);
        self.db.with_write(|tx| {
            let global = kv_ops::add_int(tx, KEY_GLOBAL_SEQUENCE, 1)?;
            let per_type = kv_ops::add_int(tx, &type_key, 1)?;
            Ok(EventSequenceId {
                global,
                event_type: per_type,
            })
        })
    }

    pub fn session_id(&self) -> Result<Option<String>, StorageError> {
        self.get_text(KEY_SESSION_ID)
    }

    pub fn set_session_id(&self, id: &str) -> Result<(), StorageError> {
        self.set_text(KEY_SESSION_ID, Some(id))
    }

    pub fn device_id(&self) -> Result<Option<String>, StorageError> {
        self.get_text(KEY_DEVICE_ID)
    }

    pub fn set_device_id(&self, id: &str) -> Result<(), StorageError> {
        self.set_text(KEY_DEVICE_ID, Some(id))
    }

    /// Return the stored device id, generating and storing one if absent.
    /// Racing processes all observe the first winner's id.
    pub fn device_id_or_init<F>(&self, generate: F) -> Result<String, StorageError>
    where
        F: FnOnce() -> String,
    {
        self.db.with_write(|tx| {
            if let Some(existing) = kv_ops::get_text(tx, KEY_DEVICE_ID)? {
                return Ok(existing);
            }
            let id = generate();
            kv_ops::set_text(tx, KEY_DEVICE_ID, Some(&id))?;
            tracing::info!(device_id = %id, "generated device id");
            Ok(id)
        })
    }

    /// Same contract as `device_id_or_init`, for the session id.
    pub fn session_id_or_init<F>(&self, generate: F) -> Result<String, StorageError>
    where
        F: FnOnce() -> String,
    {
        self.db.with_write(|tx| {
            if let Some(existing) = kv_ops::get_text(tx, KEY_SESSION_ID)? {
                return Ok(existing);
            }
            let id = generate();
            kv_ops::set_text(tx, KEY_SESSION_ID, Some(&id))?;
            Ok(id)
        })
    }

    pub fn user_id(&self) -> Result<Option<String>, StorageError> {
        self.get_text(KEY_USER_ID)
    }

    /// Store the login user id. A non-empty id also becomes the latest
    /// non-null user id. Returns the previous latest non-null id.
    pub fn set_user_id(&self, id: Option<&str>) -> Result<Option<String>, StorageError> {
        let id = id.filter(|s| !s.is_empty());
        self.db.with_write(|tx| {
            let previous = kv_ops::get_text(tx, KEY_LATEST_USER_ID)?;
            kv_ops::set_text(tx, KEY_USER_ID, id)?;
            if id.is_some() {
                kv_ops::set_text(tx, KEY_LATEST_USER_ID, id)?;
            }
            Ok(previous)
        })
    }

    pub fn latest_non_null_user_id(&self) -> Result<Option<String>, StorageError> {
        self.get_text(KEY_LATEST_USER_ID)
    }

    pub fn user_key(&self) -> Result<Option<String>, StorageError> {
        self.get_text(KEY_USER_KEY)
    }

    pub fn set_user_key(&self, key: Option<&str>) -> Result<(), StorageError> {
        self.set_text(KEY_USER_KEY, key.filter(|s| !s.is_empty()))
    }

    pub fn latest_pause_time(&self) -> Result<Option<i64>, StorageError> {
        self.db.with_conn(|conn| kv_ops::get_int(conn, KEY_LATEST_PAUSE_TIME))
    }

    pub fn set_latest_pause_time(&self, millis: i64) -> Result<(), StorageError> {
        self.db
            .with_write(|tx| kv_ops::set_int(tx, KEY_LATEST_PAUSE_TIME, millis))
    }

    /// Count of foreground activities across processes. Never below 0.
    pub fn activity_count(&self) -> Result<i64, StorageError> {
        self.db
            .with_conn(|conn| kv_ops::get_int(conn, KEY_ACTIVITY_COUNT))
            .map(|v| v.unwrap_or(0))
    }

    pub fn increment_activity_count(&self) -> Result<i64, StorageError> {
        self.db
            .with_write(|tx| kv_ops::add_int(tx, KEY_ACTIVITY_COUNT, 1))
    }

    pub fn decrement_activity_count(&self) -> Result<i64, StorageError> {
        self.db.with_write(|tx| {
            let current = kv_ops::get_int(tx, KEY_ACTIVITY_COUNT)?.unwrap_or(0);
            let next = (current - 1).max(0);
            kv_ops::set_int(tx, KEY_ACTIVITY_COUNT, next)?;
            Ok(next)
        })
    }

    pub fn visit_sent(&self) -> Result<bool, StorageError> {
        self.db
            .with_conn(|conn| kv_ops::get_int(conn, KEY_VISIT_SENT))
            .map(|v| v.unwrap_or(0) != 0)
    }

    pub fn set_visit_sent(&self, sent: bool) -> Result<(), StorageError> {
        self.db
            .with_write(|tx| kv_ops::set_int(tx, KEY_VISIT_SENT, i64::from(sent)))
    }

    /// Reset per-run session state for the first process to start against
    /// this store: no foreground activities, no pause time, a new session
    /// that has not sent its visit yet.
    pub fn reset_session_state(&self, session_id: &str) -> Result<(), StorageError> {
        self.db.with_write(|tx| {
            kv_ops::set_int(tx, KEY_ACTIVITY_COUNT, 0)?;
            kv_ops::set_int(tx, KEY_LATEST_PAUSE_TIME, 0)?;
            let user_id = kv_ops::get_text(tx, KEY_USER_ID)?;
            kv_ops::set_text(tx, KEY_LATEST_USER_ID, user_id.as_deref())?;
            kv_ops::set_text(tx, KEY_SESSION_ID, Some(session_id))?;
            kv_ops::set_int(tx, KEY_VISIT_SENT, 0)?;
            Ok(())
        })
    }

    /// Bytes sent over cellular on `day` (days since epoch).
    pub fn cellular_bytes(&self, day: i64) -> Result<u64, StorageError> {
        self.db.with_conn(|conn| {
            if kv_ops::get_int(conn, KEY_CELLULAR_DAY)? != Some(day) {
                return Ok(0);
            }
            Ok(kv_ops::get_int(conn, KEY_CELLULAR_BYTES)?.unwrap_or(0).max(0) as u64)
        })
    }

    /// Add `bytes` to the cellular total for `day`, resetting on a new day.
    /// Returns the new total.
    pub fn add_cellular_bytes(&self, day: i64, bytes: u64) -> Result<u64, StorageError> {
        let delta = i64::try_from(bytes).unwrap_or(i64::MAX);
        self.db.with_write(|tx| {
            if kv_ops::get_int(tx, KEY_CELLULAR_DAY)? != Some(day) {
                kv_ops::set_int(tx, KEY_CELLULAR_DAY, day)?;
                kv_ops::set_int(tx, KEY_CELLULAR_BYTES, 0)?;
            }
            let total = kv_ops::add_int(tx, KEY_CELLULAR_BYTES, delta)?;
            Ok(total.max(0) as u64)
        })
    }

    /// Clear all counters and identifiers.
    pub fn wipe(&self) -> Result<(), StorageError> {
        self.db.with_write(|tx| {
            let removed = kv_ops::delete_all_except(tx, RESERVED_PREFIX)?;
            tracing::info!(removed, "counters wiped");
            Ok(())
        })
    }

    fn get_text(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.db.with_conn(|conn| kv_ops::get_text(conn, key))
    }

    fn set_text(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        self.db.with_write(|tx| kv_ops::set_text(tx, key, value))
    }
}
