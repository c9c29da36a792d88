//! # beacon-codec
//!
//! Encoders for stored rows and request bodies. Both codecs can read rows
//! written by the other, so switching codecs never strands queued events.

pub mod body;
pub mod json;
pub mod module;
pub mod proto;
pub mod protobuf;

pub use body::BodyEncoder;
pub use json::JsonCodec;
pub use module::{CodecModule, CodecPlugin};
pub use protobuf::ProtobufCodec;

use beacon_core::errors::CodecError;
use beacon_core::event::EventRecord;

/// A merged request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBatch {
    pub bytes: Vec<u8>,
    pub records: usize,
}

/// A row and batch format for event records.
pub trait Codec: Send + Sync {
    fn media_type(&self) -> &'static str;

    fn encode_one(&self, record: &EventRecord) -> Result<Vec<u8>, CodecError>;

    /// Merge rows previously produced by `encode_one` (of either codec)
    /// into one request body. Undecodable rows are skipped.
    fn encode_batch(&self, rows: &[Vec<u8>]) -> Result<EncodedBatch, CodecError>;

    fn decode_one(&self, bytes: &[u8]) -> Result<EventRecord, CodecError>;
}

/// Rows written by the JSON codec start with `{`. A protobuf row always
/// starts with the `event_type` key byte (0x08).
pub fn is_text_row(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{')
}
