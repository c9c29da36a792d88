//! Codecs: round-trips, batch framing, cross-codec rows, undecodable rows.

use std::collections::BTreeMap;

use beacon_codec::proto::EventList;
use beacon_codec::{Codec, CodecModule, JsonCodec, ProtobufCodec};
use beacon_core::config::CodecKind;
use beacon_core::constants::{MEDIA_TYPE_JSON, MEDIA_TYPE_PROTOBUF};
use beacon_core::errors::CodecError;
use beacon_core::event::{AppState, EventRecord, EventType, SendPolicy};
use beacon_core::registry::Registry;
use beacon_core::requests::{
    BodyEncodeRequest, DecodeRequest, EncodeRequest, EncodedPayload, WireRequest,
};
use prost::Message;
use proptest::prelude::*;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn sample(name: &str, seq: i64) -> EventRecord {
    let mut r = EventRecord::empty(EventType::Custom, 1_700_000_000_000 + seq);
    r.device_id = Some("dev".into());
    r.session_id = Some("sess".into());
    r.app_state = Some(AppState::Foreground);
    r.screen_width = Some(1080);
    r.latitude = Some(31.25);
    r.global_sequence_id = seq;
    r.event_sequence_id = seq;
    r.event_name = Some(name.into());
    r.attributes.insert("k".into(), "v".into());
    r
}

fn arb_event_type() -> impl Strategy<Value = EventType> {
    prop::sample::select(EventType::ALL.to_vec())
}

fn arb_opt_string() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-zA-Z0-9 _/.-]{0,16}")
}

fn arb_coord() -> impl Strategy<Value = Option<f64>> {
    prop::option::of((-90_000i32..90_000).prop_map(|v| f64::from(v) / 1000.0))
}

prop_compose! {
    fn arb_record()(
        event_type in arb_event_type(),
        instant in any::<bool>(),
        timestamp in 0i64..4_000_000_000_000,
        ids in (arb_opt_string(), arb_opt_string(), arb_opt_string(), arb_opt_string()),
        screen_width in prop::option::of(0u32..10_000),
        coords in (arb_coord(), arb_coord()),
        sequence in (1i64..1_000_000, 1i64..1_000_000),
        payload in (arb_opt_string(), arb_opt_string()),
        foreground in prop::option::of(any::<bool>()),
        attributes in prop::collection::btree_map("[a-z]{1,8}", "[a-zA-Z0-9]{0,8}", 0..4),
    ) -> EventRecord {
        let mut r = EventRecord::empty(event_type, timestamp);
        r.send_policy = if instant { SendPolicy::Instant } else { SendPolicy::Batch };
        (r.device_id, r.session_id, r.user_id, r.network_state) = ids;
        r.screen_width = screen_width;
        (r.latitude, r.longitude) = coords;
        (r.global_sequence_id, r.event_sequence_id) = sequence;
        (r.event_name, r.path) = payload;
        r.app_state = foreground.map(|f| if f { AppState::Foreground } else { AppState::Background });
        r.attributes = attributes;
        r
    }
}

// ─── Round-trip property ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn json_decode_inverts_encode(record in arb_record()) {
        let codec = JsonCodec::new();
        let bytes = codec.encode_one(&record).unwrap();
        prop_assert_eq!(codec.decode_one(&bytes).unwrap(), record);
    }

    #[test]
    fn protobuf_decode_inverts_encode(record in arb_record()) {
        let codec = ProtobufCodec::new();
        let bytes = codec.encode_one(&record).unwrap();
        prop_assert_eq!(codec.decode_one(&bytes).unwrap(), record);
    }
}

// ─── Batches ─────────────────────────────────────────────────────────────────

#[test]
fn json_batch_is_array_of_rows() {
    let codec = JsonCodec::new();
    let rows: Vec<Vec<u8>> = (1..=3)
        .map(|i| codec.encode_one(&sample(&format!("e{i}"), i)).unwrap())
        .collect();
    let body = codec.encode_batch(&rows).unwrap().bytes;

    let parsed: Vec<EventRecord> = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[2].event_name.as_deref(), Some("e3"));
    let empty = codec.encode_batch(&[]).unwrap();
    assert_eq!(empty.bytes, b"[]".to_vec());
    assert_eq!(empty.records, 0);
}

#[test]
fn protobuf_batch_frames_rows_verbatim() {
    let codec = ProtobufCodec::new();
    let records: Vec<EventRecord> = (1..=3).map(|i| sample(&format!("e{i}"), i)).collect();
    let rows: Vec<Vec<u8>> = records.iter().map(|r| codec.encode_one(r).unwrap()).collect();
    let body = codec.encode_batch(&rows).unwrap().bytes;

    let list = EventList::decode(body.as_slice()).unwrap();
    assert_eq!(list.values.len(), 3);
    let decoded: Vec<EventRecord> = list
        .values
        .into_iter()
        .map(|dto| EventRecord::try_from(dto).unwrap())
        .collect();
    assert_eq!(decoded, records);
}

#[test]
fn protobuf_batch_converts_legacy_text_rows() {
    let proto = ProtobufCodec::new();
    let json = JsonCodec::new();
    let rows = vec![
        proto.encode_one(&sample("binary", 1)).unwrap(),
        json.encode_one(&sample("text", 2)).unwrap(),
    ];
    let list = EventList::decode(proto.encode_batch(&rows).unwrap().bytes.as_slice()).unwrap();
    let names: Vec<_> = list.values.iter().map(|d| d.event_name.clone().unwrap()).collect();
    assert_eq!(names, vec!["binary", "text"]);
}

#[test]
fn undecodable_rows_are_skipped_individually() {
    let proto = ProtobufCodec::new();
    let rows = vec![
        proto.encode_one(&sample("ok-1", 1)).unwrap(),
        vec![0xFF, 0xFF, 0xFF],
        b"{ not json".to_vec(),
        proto.encode_one(&sample("ok-2", 2)).unwrap(),
    ];
    let list = EventList::decode(proto.encode_batch(&rows).unwrap().bytes.as_slice()).unwrap();
    assert_eq!(list.values.len(), 2);

    let json = JsonCodec::new();
    let merged = json.encode_batch(&rows).unwrap();
    assert_eq!(merged.records, 2);
    let parsed: Vec<EventRecord> = serde_json::from_slice(&merged.bytes).unwrap();
    let names: Vec<_> = parsed.iter().map(|r| r.event_name.clone().unwrap()).collect();
    assert_eq!(names, vec!["ok-1", "ok-2"]);
}

#[test]
fn json_batch_keeps_good_text_rows_around_malformed_ones() {
    let json = JsonCodec::new();
    let rows = vec![
        json.encode_one(&sample("first", 1)).unwrap(),
        b"{not json".to_vec(),
        b"{\"eventType\":".to_vec(),
        json.encode_one(&sample("last", 2)).unwrap(),
    ];
    let merged = json.encode_batch(&rows).unwrap();
    assert_eq!(merged.records, 2);
    let parsed: Vec<EventRecord> = serde_json::from_slice(&merged.bytes).unwrap();
    assert_eq!(parsed, vec![sample("first", 1), sample("last", 2)]);

    let only_garbage = json.encode_batch(&rows[1..3]).unwrap();
    assert_eq!(only_garbage.records, 0);
    assert_eq!(only_garbage.bytes, b"[]".to_vec());
}

#[test]
fn binary_decode_falls_back_to_text_then_fails() {
    let proto = ProtobufCodec::new();
    let text = JsonCodec::new().encode_one(&sample("legacy", 9)).unwrap();
    assert_eq!(proto.decode_one(&text).unwrap().event_name.as_deref(), Some("legacy"));

    let err = proto.decode_one(&[0xFF, 0x01, 0x02]).unwrap_err();
    assert!(matches!(err, CodecError::Undecodable { .. }));
}

// ─── Registry wiring ─────────────────────────────────────────────────────────

#[test]
fn module_registers_configured_codec() {
    let mut registry = Registry::new();
    registry.install(&CodecModule::new(CodecKind::Json, false));

    let payload = registry
        .execute::<EncodeRequest, EncodedPayload>(EncodeRequest::One(sample("x", 1)))
        .unwrap();
    assert_eq!(payload.media_type, MEDIA_TYPE_JSON);
    let back = registry
        .execute::<DecodeRequest, EventRecord>(DecodeRequest(payload.bytes))
        .unwrap();
    assert_eq!(back, sample("x", 1));
    assert!(!registry.contains::<BodyEncodeRequest, WireRequest>());

    let mut registry = Registry::new();
    registry.install(&CodecModule::new(CodecKind::Protobuf, true));
    let payload = registry
        .execute::<EncodeRequest, EncodedPayload>(EncodeRequest::Batch(vec![]))
        .unwrap();
    assert_eq!(payload.media_type, MEDIA_TYPE_PROTOBUF);
    assert!(payload.bytes.is_empty());
    assert_eq!(payload.records, 0);
    assert!(registry.contains::<BodyEncodeRequest, WireRequest>());
}

#[test]
fn attribute_order_is_deterministic() {
    let mut a = sample("x", 1);
    let mut attrs = BTreeMap::new();
    attrs.insert("b".to_string(), "2".to_string());
    attrs.insert("a".to_string(), "1".to_string());
    a.attributes = attrs;
    let one = JsonCodec::new().encode_one(&a).unwrap();
    let two = JsonCodec::new().encode_one(&a.clone()).unwrap();
    assert_eq!(one, two);
    let text = String::from_utf8(one).unwrap();
    assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
}
