//! Codec errors.

use super::error_code::{self, ErrorCode};

/// Errors from encoding or decoding event payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    #[error("undecodable payload ({len} bytes): {reason}")]
    Undecodable { len: usize, reason: String },

    #[error("unknown event type tag: {0}")]
    UnknownEventType(String),

    #[error("body encoding failed: {0}")]
    BodyEncodingFailed(String),
}

impl ErrorCode for CodecError {
    fn error_code(&self) -> &'static str {
        error_code::CODEC_ERROR
    }
}
