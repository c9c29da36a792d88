//! Event build errors.

use super::error_code::{self, ErrorCode};

/// Errors raised while building an event. Always non-fatal to the actor.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("interceptor {name} failed: {message}")]
    InterceptorFailed { name: String, message: String },

    #[error("interceptor {name} panicked")]
    InterceptorPanicked { name: String },

    #[error("malformed field {field}: {message}")]
    MalformedField { field: String, message: String },

    #[error("build actor is shut down")]
    ActorStopped,

    #[error("cannot spawn thread {name}: {message}")]
    ThreadSpawn { name: String, message: String },
}

impl ErrorCode for BuildError {
    fn error_code(&self) -> &'static str {
        error_code::BUILD_ERROR
    }
}
