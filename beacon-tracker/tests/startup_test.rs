mod common;

use std::sync::Arc;

use beacon_core::errors::{BeaconError, BeaconResult};
use beacon_core::event::{EventBuilder, EventRecord, EventType, SendPolicy, StoreCategory};
use beacon_core::registry::{FnHandler, Module, Registry};
use beacon_core::requests::{DeviceId, DeviceIdRequest, QueueInsert, WireRequest, WireResponse};
use beacon_storage::{EventQueue, LegacyStore};
use beacon_tracker::Tracker;
use common::{config, recorder, wait_until, FakeTransport, FakeTransportModule, WAIT};
use tempfile::TempDir;

fn legacy_json(name: &str, ts: i64) -> Vec<u8> {
    let mut record = EventRecord::empty(EventType::Custom, ts);
    record.event_name = Some(name.to_string());
    serde_json::to_vec(&record).unwrap()
}

#[test]
fn legacy_rows_are_migrated_and_store_removed() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path());
    std::fs::create_dir_all(dir.path()).unwrap();
    let legacy_path = cfg.legacy_db_path();
    let now = chrono::Utc::now().timestamp_millis();
    {
        let legacy = LegacyStore::create(&legacy_path).unwrap();
        legacy.insert(&legacy_json("old-1", now - 3_000), now - 3_000).unwrap();
        legacy.insert(b"\x00\x01garbage", now - 2_000).unwrap();
        legacy.insert(&legacy_json("old-2", now - 1_000), now - 1_000).unwrap();
    }

    let transport = FakeTransport::new();
    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    assert!(wait_until(WAIT, || !legacy_path.exists()));
    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert!(report.is_complete());
    let names: Vec<_> = transport
        .delivered()
        .iter()
        .filter_map(|r| r.event_name.clone())
        .collect();
    assert_eq!(names, vec!["old-1", "old-2"]);
    assert_eq!(tracker.pending_rows(), 0);
}

#[test]
fn stale_rows_are_swept_at_startup() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path());
    {
        let queue = EventQueue::open(&cfg.db_path(), &cfg.storage).unwrap();
        let now = chrono::Utc::now().timestamp_millis();
        for (age_days, name) in [(40, "ancient"), (0, "fresh")] {
            let mut record = EventRecord::empty(EventType::Custom, now - age_days * 86_400_000);
            record.event_name = Some(name.into());
            queue
                .insert(QueueInsert {
                    category: StoreCategory::Track,
                    policy: SendPolicy::Batch,
                    data: serde_json::to_vec(&record).unwrap(),
                    created_at: record.timestamp,
                })
                .unwrap();
        }
    }

    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(FakeTransport::new()))
        .start()
        .unwrap();
    assert!(wait_until(WAIT, || tracker.pending_rows() == 1));
}

#[test]
fn invalid_config_fails_start() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(dir.path());
    cfg.project_id = String::new();
    let err = Tracker::start(cfg).err().unwrap();
    assert!(matches!(err, BeaconError::Config(_)));
    assert!(!cfg_db_exists(dir.path()));
}

fn cfg_db_exists(dir: &std::path::Path) -> bool {
    config(dir).db_path().exists()
}

#[test]
fn host_plugins_override_builtins() {
    let dir = TempDir::new().unwrap();
    let urls = Arc::new(std::sync::Mutex::new(Vec::new()));

    struct Plugins(Arc<std::sync::Mutex<Vec<String>>>);
    impl Module for Plugins {
        fn name(&self) -> &'static str {
            "host"
        }
        fn register_components(&self, registry: &mut Registry) {
            registry.register_fn::<DeviceIdRequest, DeviceId, _>(|_| Ok(DeviceId("vendor-42".into())));
            let seen = self.0.clone();
            registry.register_handler::<WireRequest, WireResponse>(Arc::new(FnHandler::new(
                move |req: WireRequest| -> BeaconResult<WireResponse> {
                    seen.lock().unwrap().push(req.url);
                    Ok(WireResponse {
                        status: 204,
                        body: Vec::new(),
                    })
                },
            )));
        }
    }

    let (observer, records) = recorder();
    let tracker = Tracker::builder(config(dir.path()))
        .with_module(Plugins(urls.clone()))
        .with_interceptor(observer)
        .start()
        .unwrap();
    tracker.submit(EventBuilder::custom("via-host"));
    assert!(tracker.wait_idle(WAIT));
    assert_eq!(
        records.lock().unwrap()[0].device_id.as_deref(),
        Some("vendor-42")
    );

    tracker.flush_and_wait(WAIT).unwrap();
    assert!(wait_until(WAIT, || urls.lock().unwrap().len() == 2));
    assert_eq!(tracker.pending_rows(), 0);
}
