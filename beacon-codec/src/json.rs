//! Structured-text codec.

use beacon_core::constants::MEDIA_TYPE_JSON;
use beacon_core::errors::CodecError;
use beacon_core::event::EventRecord;
use prost::Message;
use tracing::warn;

use crate::proto::EventDto;
use crate::{is_text_row, Codec, EncodedBatch};

/// One JSON object per row; batches are a JSON array.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }

    fn from_binary(bytes: &[u8]) -> Result<EventRecord, CodecError> {
        let dto = EventDto::decode(bytes).map_err(|e| CodecError::Undecodable {
            len: bytes.len(),
            reason: e.to_string(),
        })?;
        EventRecord::try_from(dto)
    }
}

impl Codec for JsonCodec {
    fn media_type(&self) -> &'static str {
        MEDIA_TYPE_JSON
    }

    fn encode_one(&self, record: &EventRecord) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(record).map_err(|e| CodecError::EncodeFailed(e.to_string()))
    }

    fn encode_batch(&self, rows: &[Vec<u8>]) -> Result<EncodedBatch, CodecError> {
        let mut out = Vec::with_capacity(rows.iter().map(Vec::len).sum::<usize>() + rows.len() + 2);
        out.push(b'[');
        let mut records = 0usize;
        for row in rows {
            let converted;
            let text: &[u8] = if is_text_row(row) {
                if let Err(e) = serde_json::from_slice::<EventRecord>(row) {
                    warn!(error = %e, len = row.len(), "skipping malformed text row");
                    continue;
                }
                row
            } else {
                match Self::from_binary(row).and_then(|r| self.encode_one(&r)) {
                    Ok(bytes) => {
                        converted = bytes;
                        &converted
                    }
                    Err(e) => {
                        warn!(error = %e, "skipping undecodable row");
                        continue;
                    }
                }
            };
            if records > 0 {
                out.push(b',');
            }
            out.extend_from_slice(text);
            records += 1;
        }
        out.push(b']');
        Ok(EncodedBatch {
            bytes: out,
            records,
        })
    }

    fn decode_one(&self, bytes: &[u8]) -> Result<EventRecord, CodecError> {
        match serde_json::from_slice::<EventRecord>(bytes) {
            Ok(record) => Ok(record),
            Err(text_err) if is_text_row(bytes) => Err(CodecError::Undecodable {
                len: bytes.len(),
                reason: text_err.to_string(),
            }),
            Err(_) => Self::from_binary(bytes),
        }
    }
}
