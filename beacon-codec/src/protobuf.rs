//! Binary codec.

use beacon_core::constants::MEDIA_TYPE_PROTOBUF;
use beacon_core::errors::CodecError;
use beacon_core::event::EventRecord;
use prost::encoding::{encode_key, encode_varint, WireType};
use prost::Message;
use tracing::warn;

use crate::proto::{EventDto, EVENT_LIST_VALUES_TAG};
use crate::{is_text_row, Codec, EncodedBatch};

/// One `EventDto` per row; batches are an `EventList`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl ProtobufCodec {
    pub fn new() -> Self {
        Self
    }

    fn from_text(bytes: &[u8]) -> Result<EventRecord, CodecError> {
        serde_json::from_slice::<EventRecord>(bytes).map_err(|e| CodecError::Undecodable {
            len: bytes.len(),
            reason: e.to_string(),
        })
    }

    fn from_binary(bytes: &[u8]) -> Result<EventRecord, CodecError> {
        let dto = EventDto::decode(bytes).map_err(|e| CodecError::Undecodable {
            len: bytes.len(),
            reason: e.to_string(),
        })?;
        EventRecord::try_from(dto)
    }

    /// Frame an encoded `EventDto` as one `EventList.values` element.
    fn push_framed(out: &mut Vec<u8>, encoded: &[u8]) {
        encode_key(EVENT_LIST_VALUES_TAG, WireType::LengthDelimited, out);
        encode_varint(encoded.len() as u64, out);
        out.extend_from_slice(encoded);
    }
}

impl Codec for ProtobufCodec {
    fn media_type(&self) -> &'static str {
        MEDIA_TYPE_PROTOBUF
    }

    fn encode_one(&self, record: &EventRecord) -> Result<Vec<u8>, CodecError> {
        Ok(EventDto::from(record).encode_to_vec())
    }

    fn encode_batch(&self, rows: &[Vec<u8>]) -> Result<EncodedBatch, CodecError> {
        let mut out = Vec::with_capacity(rows.iter().map(|r| r.len() + 6).sum());
        let mut records = 0usize;
        for row in rows {
            if is_text_row(row) {
                match Self::from_text(row).and_then(|r| self.encode_one(&r)) {
                    Ok(encoded) => {
                        Self::push_framed(&mut out, &encoded);
                        records += 1;
                    }
                    Err(e) => warn!(error = %e, "skipping unconvertible text row"),
                }
            } else if let Err(e) = Self::from_binary(row) {
                warn!(error = %e, len = row.len(), "skipping undecodable row");
            } else {
                Self::push_framed(&mut out, row);
                records += 1;
            }
        }
        Ok(EncodedBatch {
            bytes: out,
            records,
        })
    }

    fn decode_one(&self, bytes: &[u8]) -> Result<EventRecord, CodecError> {
        if !is_text_row(bytes) {
            if let Ok(record) = Self::from_binary(bytes) {
                return Ok(record);
            }
        }
        Self::from_text(bytes)
    }
}
