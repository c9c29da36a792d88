//! Top-level error aggregating every subsystem error.

use super::error_code::{self, ErrorCode};
use super::{BuildError, CodecError, ConfigError, RegistryError, StorageError, TransportError};

/// Errors that can cross a crate boundary inside the pipeline.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ErrorCode for BeaconError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Registry(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Codec(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Build(e) => e.error_code(),
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}

/// Convenience alias used across the workspace.
pub type BeaconResult<T> = Result<T, BeaconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_keeps_subsystem_code() {
        let err: BeaconError = StorageError::PayloadTooLarge { size: 3, limit: 2 }.into();
        assert_eq!(err.error_code(), error_code::PAYLOAD_TOO_LARGE);
        assert!(err.diagnostic().starts_with("[PAYLOAD_TOO_LARGE] Storage error:"));
        assert_eq!(BeaconError::Cancelled.error_code(), error_code::CANCELLED);
    }
}
