//! Registry wiring for the HTTP transport.

use std::sync::Arc;

use beacon_core::config::TransportConfig;
use beacon_core::registry::{Handler, Module, Registry};
use beacon_core::requests::{WireRequest, WireResponse};
use beacon_core::sync::CancellationToken;

use crate::http_client::{HttpClient, HttpClientConfig};

/// Registers a lazily built [`HttpClient`] for `WireRequest -> WireResponse`.
pub struct TransportModule {
    config: HttpClientConfig,
    cancel: CancellationToken,
}

impl TransportModule {
    pub fn new(config: &TransportConfig, cancel: CancellationToken) -> Self {
        Self {
            config: HttpClientConfig::from(config),
            cancel,
        }
    }

    pub fn with_client_config(config: HttpClientConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }
}

impl Module for TransportModule {
    fn name(&self) -> &'static str {
        "http-transport"
    }

    fn register_components(&self, registry: &mut Registry) {
        let config = self.config.clone();
        let cancel = self.cancel.clone();
        registry.register_singleton::<WireRequest, WireResponse, _>(move || {
            let client = HttpClient::with_cancellation(config.clone(), cancel.clone())?;
            Ok(Arc::new(client) as Arc<dyn Handler<WireRequest, WireResponse>>)
        });
    }
}
