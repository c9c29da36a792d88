//! Request and result types the pipeline resolves through the registry.
//!
//! | request             | result           |
//! |---------------------|------------------|
//! | `QueueCommand`      | `QueueReply`     |
//! | `EncodeRequest`     | `EncodedPayload` |
//! | `DecodeRequest`     | `EventRecord`    |
//! | `BodyEncodeRequest` | `WireRequest`    |
//! | `WireRequest`       | `WireResponse`   |
//! | `DeviceIdRequest`   | `DeviceId`       |

use crate::event::{EventRecord, SendPolicy, StoreCategory};

// ─── Queue ─────────────────────────────────────────────────────────────────

/// A row to append to the durable queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInsert {
    pub category: StoreCategory,
    pub policy: SendPolicy,
    pub data: Vec<u8>,
    pub created_at: i64,
}

/// A stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRow {
    pub id: i64,
    pub category: StoreCategory,
    pub policy: SendPolicy,
    pub data: Vec<u8>,
    pub created_at: i64,
}

/// Oldest rows of one policy and one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedBatch {
    pub rows: Vec<QueueRow>,
    pub max_row_id: i64,
    pub total_bytes: usize,
    /// `None` when the batch is empty.
    pub category: Option<StoreCategory>,
}

impl FetchedBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCommand {
    Insert(QueueInsert),
    FetchOldest {
        policy: SendPolicy,
        limit: usize,
        max_bytes: usize,
    },
    DeleteUpTo {
        row_id: i64,
        policy: SendPolicy,
        category: StoreCategory,
    },
    DeleteAll,
    EvictStale {
        older_than_days: u32,
    },
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueReply {
    Inserted(i64),
    Fetched(FetchedBatch),
    Deleted(usize),
    Count(usize),
}

impl QueueReply {
    pub fn into_fetched(self) -> Option<FetchedBatch> {
        match self {
            Self::Fetched(batch) => Some(batch),
            _ => None,
        }
    }

    pub fn inserted_id(&self) -> Option<i64> {
        match self {
            Self::Inserted(id) => Some(*id),
            _ => None,
        }
    }

    /// Rows deleted or counted.
    pub fn affected(&self) -> Option<usize> {
        match self {
            Self::Deleted(n) | Self::Count(n) => Some(*n),
            _ => None,
        }
    }
}

// ─── Codec ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EncodeRequest {
    /// Encode one record for storage or an instant send.
    One(EventRecord),
    /// Merge rows that were already encoded by `One`.
    Batch(Vec<Vec<u8>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub bytes: Vec<u8>,
    pub media_type: String,
    /// Records contained in `bytes`. Lower than the rows given when some
    /// were undecodable.
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest(pub Vec<u8>);

/// Request to transform an outgoing body (compression, obfuscation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyEncodeRequest(pub WireRequest);

// ─── Transport ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Millis since epoch at request construction.
    pub send_time: i64,
}

impl WireRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ─── Identity ──────────────────────────────────────────────────────────────

/// Ask a vendor id provider for a stable device id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceIdRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(pub String);
