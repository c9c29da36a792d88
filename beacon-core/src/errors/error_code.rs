//! Stable error codes for host-facing diagnostics.

/// Every error enum exposes a stable code string so hosts can match on
/// failures without parsing messages.
pub trait ErrorCode {
    /// Returns the error code string (e.g., "STORAGE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted diagnostic string: `[ERROR_CODE] message`.
    fn diagnostic(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const REGISTRY_ERROR: &str = "REGISTRY_ERROR";
pub const NO_REGISTERED_HANDLER: &str = "NO_REGISTERED_HANDLER";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
pub const DISK_FULL: &str = "DISK_FULL";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const CODEC_ERROR: &str = "CODEC_ERROR";
pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
pub const TIMEOUT: &str = "TIMEOUT";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const BUILD_ERROR: &str = "BUILD_ERROR";
pub const CANCELLED: &str = "CANCELLED";
