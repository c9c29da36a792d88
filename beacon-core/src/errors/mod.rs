//! Error handling for Beacon.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod beacon_error;
pub mod build_error;
pub mod codec_error;
pub mod config_error;
pub mod error_code;
pub mod registry_error;
pub mod storage_error;
pub mod transport_error;

pub use beacon_error::{BeaconError, BeaconResult};
pub use build_error::BuildError;
pub use codec_error::CodecError;
pub use config_error::ConfigError;
pub use error_code::ErrorCode;
pub use registry_error::RegistryError;
pub use storage_error::StorageError;
pub use transport_error::TransportError;
