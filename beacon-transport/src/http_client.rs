//! HTTP client with retry, exponential backoff, timeout, and gzip.

use std::sync::Arc;
use std::time::Duration;

use beacon_core::config::TransportConfig;
use beacon_core::errors::{BeaconResult, TransportError};
use beacon_core::registry::Handler;
use beacon_core::requests::{WireRequest, WireResponse};
use beacon_core::sync::CancellationToken;

use crate::pending::PendingResponse;

/// Configuration for the HTTP transport layer.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry).
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Ignore system proxy settings.
    pub no_proxy: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for HttpClientConfig {
    fn from(config: &TransportConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            no_proxy: false,
        }
    }
}

/// Blocking transport. Network errors and 5xx responses are retried with
/// backoff; any other response is returned to the caller as-is.
#[derive(Debug)]
pub struct HttpClient {
    config: HttpClientConfig,
    client: reqwest::blocking::Client,
    cancel: CancellationToken,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, TransportError> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Build a client whose backoff sleeps end early when `cancel` fires.
    pub fn with_cancellation(
        config: HttpClientConfig,
        cancel: CancellationToken,
    ) -> Result<Self, TransportError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .gzip(true);
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(|e| TransportError::NetworkError {
            reason: e.to_string(),
        })?;
        Ok(Self {
            config,
            client,
            cancel,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// POST `request`, retrying transient failures.
    pub fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        let mut backoff = self.config.initial_backoff;
        let mut last_err = TransportError::NetworkError {
            reason: "no attempt made".to_string(),
        };

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    attempt,
                    max_retries = self.config.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "transport: retrying"
                );
                if self.cancel.sleep(backoff) {
                    return Err(TransportError::Cancelled);
                }
                backoff = (backoff * 2).min(self.config.max_backoff);
            }
            if self.cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            let mut req = self.client.post(&request.url).body(request.body.clone());
            for (name, value) in &request.headers {
                req = req.header(name.as_str(), value.as_str());
            }

            match req.send() {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.bytes().map(|b| b.to_vec()).unwrap_or_default();
                    let response = WireResponse {
                        status: status.as_u16(),
                        body,
                    };
                    if !status.is_server_error() {
                        return Ok(response);
                    }
                    tracing::warn!(status = status.as_u16(), url = %request.url, "collector error");
                    last_err = TransportError::Rejected {
                        status: status.as_u16(),
                    };
                }
                Err(e) if e.is_timeout() => {
                    last_err = TransportError::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    };
                }
                Err(e) => {
                    last_err = TransportError::NetworkError {
                        reason: e.to_string(),
                    };
                }
            }
        }

        tracing::warn!(error = %last_err, url = %request.url, "transport: retries exhausted");
        Err(last_err)
    }

    /// Send on a background thread. The returned handle yields the result.
    pub fn send_async(self: &Arc<Self>, request: WireRequest) -> PendingResponse {
        let (tx, pending) = PendingResponse::channel();
        let client = Arc::clone(self);
        let spawned = std::thread::Builder::new()
            .name("beacon-http".to_string())
            .spawn(move || {
                let _ = tx.send(client.send(&request));
            });
        if let Err(e) = spawned {
            return PendingResponse::ready(Err(TransportError::NetworkError {
                reason: format!("cannot spawn sender thread: {e}"),
            }));
        }
        pending
    }
}

impl Handler<WireRequest, WireResponse> for HttpClient {
    fn handle(&self, request: WireRequest) -> BeaconResult<WireResponse> {
        Ok(self.send(&request)?)
    }
}
