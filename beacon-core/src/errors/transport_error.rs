//! Transport errors.

use super::error_code::{self, ErrorCode};

/// Errors surfaced by transport plugins. Never crosses into host code.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {reason}")]
    NetworkError { reason: String },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("collector rejected request with HTTP {status}")]
    Rejected { status: u16 },

    #[error("malformed request: {0}")]
    InvalidRequest(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => error_code::TIMEOUT,
            Self::Cancelled => error_code::CANCELLED,
            _ => error_code::TRANSPORT_ERROR,
        }
    }
}
