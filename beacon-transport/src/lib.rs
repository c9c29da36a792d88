//! # beacon-transport
//!
//! Sends wire requests to the collector. Registered in the plugin registry
//! as the `WireRequest -> WireResponse` provider.

pub mod http_client;
pub mod module;
pub mod pending;

pub use http_client::{HttpClient, HttpClientConfig};
pub use module::TransportModule;
pub use pending::PendingResponse;
