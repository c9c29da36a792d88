mod common;

use std::collections::BTreeMap;

use beacon_codec::body::{decode_body, HEADER_COMPRESS_CODEC};
use beacon_core::config::CodecKind;
use beacon_core::event::{EventBuilder, EventRecord, EventType, SendPolicy};
use beacon_storage::SenderLock;
use beacon_tracker::{FlushStop, NetworkState, Tracker};
use common::{config, wait_until, FakeTransport, FakeTransportModule, WAIT};
use tempfile::TempDir;

fn custom(tracker: &Tracker, names: &[&str]) {
    for name in names {
        tracker.track_custom_event(name, BTreeMap::new());
    }
}

#[test]
fn batch_rows_wait_for_a_flush() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let tracker = Tracker::builder(config(dir.path()))
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["a", "b", "c"]);
    assert!(tracker.wait_idle(WAIT));
    // The visit is instant and goes out on its own.
    assert!(wait_until(WAIT, || transport.requests().len() == 1));
    assert_eq!(tracker.pending_rows(), 3);

    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.sent_rows, 3);
    assert_eq!(tracker.pending_rows(), 0);

    let delivered = transport.delivered();
    let names: Vec<_> = delivered.iter().filter_map(|r| r.event_name.clone()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(delivered[0].event_type, EventType::Visit);
}

#[test]
fn failed_flush_leaves_rows_for_next_cycle() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.set_failing(true);
    let tracker = Tracker::builder(config(dir.path()))
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["1", "2", "3", "4", "5"]);
    assert!(tracker.wait_idle(WAIT));
    assert!(wait_until(WAIT, || tracker.pending_rows() == 6));

    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert_eq!(report.stopped, Some(FlushStop::SendFailed));
    assert_eq!(report.sent_rows, 0);
    assert_eq!(tracker.pending_rows(), 6);

    transport.set_failing(false);
    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.sent_rows, 6);
    assert_eq!(tracker.pending_rows(), 0);

    // Instant rows go first, then batch rows in insertion order.
    let delivered: Vec<EventType> = transport.delivered().iter().map(|r| r.event_type).collect();
    assert_eq!(delivered[0], EventType::Visit);
    assert!(delivered[1..].iter().all(|t| *t == EventType::Custom));
}

#[test]
fn failing_instant_send_stays_queued() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    transport.set_failing(true);
    let tracker = Tracker::builder(config(dir.path()))
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    tracker.submit(EventBuilder::custom("urgent").with_send_policy(SendPolicy::Instant));
    assert!(tracker.wait_idle(WAIT));
    // Synthetic visit plus the urgent event, both instant.
    assert!(wait_until(WAIT, || tracker.pending_rows() == 2));

    let batch = tracker
        .context()
        .queue()
        .fetch_oldest(SendPolicy::Instant, 10, usize::MAX)
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert!(transport.requests().is_empty());
}

#[test]
fn offline_defers_until_connectivity_returns() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let tracker = Tracker::builder(config(dir.path()))
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    tracker.set_network_state(NetworkState::Disconnected);
    custom(&tracker, &["x", "y"]);
    assert!(tracker.wait_idle(WAIT));
    assert_eq!(tracker.pending_rows(), 3);

    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert_eq!(report.stopped, Some(FlushStop::Offline));
    assert!(transport.requests().is_empty());

    tracker.set_network_state(NetworkState::Wifi);
    assert!(wait_until(WAIT, || tracker.pending_rows() == 0));
    assert_eq!(transport.delivered().len(), 3);
}

#[test]
fn threshold_triggers_eager_flush() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let mut cfg = config(dir.path());
    cfg.delivery.flush_threshold = 3;
    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["1", "2", "3"]);
    assert!(wait_until(WAIT, || transport.delivered().len() == 4));
    assert_eq!(tracker.pending_rows(), 0);
}

#[test]
fn zero_interval_flushes_every_insert() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let mut cfg = config(dir.path());
    cfg.delivery.flush_interval_secs = 0;
    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["only"]);
    assert!(wait_until(WAIT, || transport.delivered().len() == 2));
}

#[test]
fn low_memory_caps_rows_per_request() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let tracker = Tracker::builder(config(dir.path()))
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    tracker.set_low_memory(true);
    custom(&tracker, &["1", "2", "3", "4", "5", "6", "7"]);
    assert!(tracker.wait_idle(WAIT));
    assert!(wait_until(WAIT, || transport.requests().len() == 1));

    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert_eq!(report.requests, 3);
    let sizes: Vec<usize> = transport.requests()[1..]
        .iter()
        .map(|r| serde_json::from_slice::<Vec<EventRecord>>(&r.body).unwrap().len())
        .collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn exhausted_cellular_budget_holds_batch_rows() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let mut cfg = config(dir.path());
    cfg.delivery.cellular_data_limit_mb = 0;
    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    tracker.set_network_state(NetworkState::Cellular);
    custom(&tracker, &["a", "b"]);
    assert!(tracker.wait_idle(WAIT));
    // Instant rows are never held back.
    assert!(wait_until(WAIT, || transport.requests().len() == 1));

    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert!(report.cellular_limited);
    assert_eq!(report.sent_rows, 0);
    assert_eq!(tracker.pending_rows(), 2);

    tracker.set_network_state(NetworkState::Wifi);
    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert_eq!(report.sent_rows, 2);
}

#[test]
fn encoded_body_round_trips() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let mut cfg = config(dir.path());
    cfg.delivery.encrypt_body = true;
    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["sealed"]);
    assert!(tracker.wait_idle(WAIT));
    tracker.flush_and_wait(WAIT).unwrap();
    assert!(wait_until(WAIT, || transport.requests().len() == 2));

    for request in transport.requests() {
        assert_eq!(request.header(HEADER_COMPRESS_CODEC), Some("zstd"));
        let plain = decode_body(&request.body, request.send_time).unwrap();
        let records: Vec<EventRecord> = serde_json::from_slice(&plain).unwrap();
        assert_eq!(records.len(), 1);
        assert!(request.url.ends_with(&format!("stm={}", request.send_time)));
    }
}

#[test]
fn protobuf_requests_advertise_media_type() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let mut cfg = config(dir.path());
    cfg.delivery.codec = CodecKind::Protobuf;
    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["pb"]);
    assert!(tracker.wait_idle(WAIT));
    let report = tracker.flush_and_wait(WAIT).unwrap();
    assert_eq!(report.sent_rows, 1);
    assert!(wait_until(WAIT, || transport.requests().len() == 2));
    for request in transport.requests() {
        assert_eq!(request.header("Content-Type"), Some("application/protobuf"));
        assert!(request.url.contains("/v3/projects/test-project/collect?stm="));
    }
}

#[test]
fn flush_skipped_while_another_sender_holds_the_lock() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let cfg = config(dir.path());
    let lock_path = cfg.sender_lock_path();
    let tracker = Tracker::builder(cfg)
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["held"]);
    assert!(tracker.wait_idle(WAIT));

    let mut other = SenderLock::open(&lock_path).unwrap();
    let outcome = other
        .try_run(|| tracker.flush_and_wait(WAIT))
        .unwrap()
        .unwrap();
    assert!(outcome.is_none());
    assert_eq!(tracker.pending_rows(), 1);

    assert!(tracker.flush_and_wait(WAIT).is_some());
    assert_eq!(tracker.pending_rows(), 0);
}

#[test]
fn shutdown_runs_a_final_flush() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new();
    let tracker = Tracker::builder(config(dir.path()))
        .with_module(FakeTransportModule(transport.clone()))
        .start()
        .unwrap();

    custom(&tracker, &["last", "words"]);
    tracker.shutdown();

    let names: Vec<_> = transport
        .delivered()
        .iter()
        .filter_map(|r| r.event_name.clone())
        .collect();
    assert_eq!(names, vec!["last", "words"]);
}
