//! Channel-backed handle on an in-flight request.

use std::time::Duration;

use beacon_core::errors::TransportError;
use beacon_core::requests::WireResponse;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

type Outcome = Result<WireResponse, TransportError>;

/// Result of [`crate::HttpClient::send_async`].
#[derive(Debug)]
pub struct PendingResponse {
    rx: Receiver<Outcome>,
}

impl PendingResponse {
    pub(crate) fn channel() -> (Sender<Outcome>, Self) {
        let (tx, rx) = bounded(1);
        (tx, Self { rx })
    }

    pub(crate) fn ready(outcome: Outcome) -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(outcome);
        pending
    }

    /// Block until the request completes.
    pub fn wait(self) -> Outcome {
        self.rx.recv().unwrap_or(Err(TransportError::Cancelled))
    }

    /// Block up to `timeout`. The request keeps running if this times out.
    pub fn wait_timeout(self, timeout: Duration) -> Outcome {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Cancelled),
        }
    }

    /// Non-blocking poll.
    pub fn try_get(&self) -> Option<Outcome> {
        self.rx.try_recv().ok()
    }
}
