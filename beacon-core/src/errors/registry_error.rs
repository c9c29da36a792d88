//! Plugin registry errors.

use super::error_code::{self, ErrorCode};

/// Errors raised while resolving a handler from the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no handler registered for {request} -> {result}")]
    NoRegisteredHandler {
        request: &'static str,
        result: &'static str,
    },

    #[error("factory for {request} -> {result} failed to build a handler: {reason}")]
    FactoryFailed {
        request: &'static str,
        result: &'static str,
        reason: String,
    },
}

impl ErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoRegisteredHandler { .. } => error_code::NO_REGISTERED_HANDLER,
            Self::FactoryFailed { .. } => error_code::REGISTRY_ERROR,
        }
    }
}
