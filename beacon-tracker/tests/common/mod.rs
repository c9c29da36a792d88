#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use beacon_core::config::{CodecKind, TrackerConfig};
use beacon_core::errors::{BeaconResult, TransportError};
use beacon_core::event::EventRecord;
use beacon_core::registry::{Handler, Module, Registry};
use beacon_core::requests::{WireRequest, WireResponse};
use beacon_tracker::{BuildInterceptor, FnInterceptor};

pub const WAIT: Duration = Duration::from_secs(10);

/// Config with periodic flushing effectively disabled so tests decide when
/// flushes happen.
pub fn config(dir: &Path) -> TrackerConfig {
    let mut config = TrackerConfig::for_project("test-project", dir);
    config.server_host = "http://collector.invalid".to_string();
    config.delivery.codec = CodecKind::Json;
    config.delivery.flush_interval_secs = 3_600;
    config.delivery.flush_threshold = 10_000;
    config
}

/// In-process collector stand-in.
#[derive(Default)]
pub struct FakeTransport {
    failing: AtomicBool,
    requests: Mutex<Vec<WireRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Every record the collector accepted, in send order.
    pub fn delivered(&self) -> Vec<EventRecord> {
        self.requests()
            .iter()
            .flat_map(|r| serde_json::from_slice::<Vec<EventRecord>>(&r.body).unwrap())
            .collect()
    }
}

impl Handler<WireRequest, WireResponse> for FakeTransport {
    fn handle(&self, request: WireRequest) -> BeaconResult<WireResponse> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::NetworkError {
                reason: "connection refused".into(),
            }
            .into());
        }
        self.requests.lock().unwrap().push(request);
        Ok(WireResponse {
            status: 200,
            body: Vec::new(),
        })
    }
}

pub struct FakeTransportModule(pub Arc<FakeTransport>);

impl Module for FakeTransportModule {
    fn name(&self) -> &'static str {
        "fake-transport"
    }

    fn register_components(&self, registry: &mut Registry) {
        registry.register_handler::<WireRequest, WireResponse>(self.0.clone());
    }
}

/// did-build observer collecting every finished record.
pub fn recorder() -> (Arc<dyn BuildInterceptor>, Arc<Mutex<Vec<EventRecord>>>) {
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = records.clone();
    let interceptor = FnInterceptor::did_build("recorder", move |r: &EventRecord| {
        sink.lock().unwrap().push(r.clone());
    });
    (Arc::new(interceptor), records)
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
