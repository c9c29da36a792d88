//! Protobuf message definitions for the collector wire format.

use std::collections::BTreeMap;

use beacon_core::errors::CodecError;
use beacon_core::event::{AppState, EventRecord, EventType, SendPolicy};

#[derive(Clone, PartialEq, prost::Message)]
pub struct EventDto {
    #[prost(int32, tag = "1")]
    pub event_type: i32,
    #[prost(int32, tag = "2")]
    pub send_policy: i32,
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    #[prost(string, optional, tag = "4")]
    pub device_id: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub session_id: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub user_id: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub user_key: Option<String>,
    #[prost(string, optional, tag = "8")]
    pub platform: Option<String>,
    #[prost(string, optional, tag = "9")]
    pub platform_version: Option<String>,
    #[prost(string, optional, tag = "10")]
    pub domain: Option<String>,
    #[prost(string, optional, tag = "11")]
    pub app_state: Option<String>,
    #[prost(string, optional, tag = "12")]
    pub network_state: Option<String>,
    #[prost(string, optional, tag = "13")]
    pub app_channel: Option<String>,
    #[prost(uint32, optional, tag = "14")]
    pub screen_width: Option<u32>,
    #[prost(uint32, optional, tag = "15")]
    pub screen_height: Option<u32>,
    #[prost(string, optional, tag = "16")]
    pub device_brand: Option<String>,
    #[prost(string, optional, tag = "17")]
    pub device_model: Option<String>,
    #[prost(string, optional, tag = "18")]
    pub device_type: Option<String>,
    #[prost(string, optional, tag = "19")]
    pub app_name: Option<String>,
    #[prost(string, optional, tag = "20")]
    pub app_version: Option<String>,
    #[prost(string, optional, tag = "21")]
    pub language: Option<String>,
    #[prost(double, optional, tag = "22")]
    pub latitude: Option<f64>,
    #[prost(double, optional, tag = "23")]
    pub longitude: Option<f64>,
    #[prost(string, optional, tag = "24")]
    pub sdk_version: Option<String>,
    #[prost(int64, tag = "25")]
    pub global_sequence_id: i64,
    #[prost(int64, tag = "26")]
    pub event_sequence_id: i64,
    #[prost(string, optional, tag = "27")]
    pub event_name: Option<String>,
    #[prost(string, optional, tag = "28")]
    pub path: Option<String>,
    #[prost(string, optional, tag = "29")]
    pub title: Option<String>,
    #[prost(string, optional, tag = "30")]
    pub text_value: Option<String>,
    #[prost(string, optional, tag = "31")]
    pub xpath: Option<String>,
    #[prost(btree_map = "string, string", tag = "32")]
    pub attributes: BTreeMap<String, String>,
}

/// Batch body: repeated field 1.
#[derive(Clone, PartialEq, prost::Message)]
pub struct EventList {
    #[prost(message, repeated, tag = "1")]
    pub values: Vec<EventDto>,
}

/// Field number of `EventList.values`.
pub const EVENT_LIST_VALUES_TAG: u32 = 1;

impl From<&EventRecord> for EventDto {
    fn from(r: &EventRecord) -> Self {
        Self {
            event_type: r.event_type.tag(),
            send_policy: r.send_policy.as_i64() as i32,
            timestamp: r.timestamp,
            device_id: r.device_id.clone(),
            session_id: r.session_id.clone(),
            user_id: r.user_id.clone(),
            user_key: r.user_key.clone(),
            platform: r.platform.clone(),
            platform_version: r.platform_version.clone(),
            domain: r.domain.clone(),
            app_state: r.app_state.map(|s| s.as_str().to_string()),
            network_state: r.network_state.clone(),
            app_channel: r.app_channel.clone(),
            screen_width: r.screen_width,
            screen_height: r.screen_height,
            device_brand: r.device_brand.clone(),
            device_model: r.device_model.clone(),
            device_type: r.device_type.clone(),
            app_name: r.app_name.clone(),
            app_version: r.app_version.clone(),
            language: r.language.clone(),
            latitude: r.latitude,
            longitude: r.longitude,
            sdk_version: r.sdk_version.clone(),
            global_sequence_id: r.global_sequence_id,
            event_sequence_id: r.event_sequence_id,
            event_name: r.event_name.clone(),
            path: r.path.clone(),
            title: r.title.clone(),
            text_value: r.text_value.clone(),
            xpath: r.xpath.clone(),
            attributes: r.attributes.clone(),
        }
    }
}

impl TryFrom<EventDto> for EventRecord {
    type Error = CodecError;

    fn try_from(d: EventDto) -> Result<Self, Self::Error> {
        let event_type = EventType::from_tag(d.event_type)
            .ok_or_else(|| CodecError::UnknownEventType(d.event_type.to_string()))?;
        let send_policy = SendPolicy::from_i64(i64::from(d.send_policy))
            .unwrap_or_else(|| event_type.default_policy());

        let mut r = EventRecord::empty(event_type, d.timestamp);
        r.send_policy = send_policy;
        r.device_id = d.device_id;
        r.session_id = d.session_id;
        r.user_id = d.user_id;
        r.user_key = d.user_key;
        r.platform = d.platform;
        r.platform_version = d.platform_version;
        r.domain = d.domain;
        r.app_state = d.app_state.as_deref().and_then(AppState::parse);
        r.network_state = d.network_state;
        r.app_channel = d.app_channel;
        r.screen_width = d.screen_width;
        r.screen_height = d.screen_height;
        r.device_brand = d.device_brand;
        r.device_model = d.device_model;
        r.device_type = d.device_type;
        r.app_name = d.app_name;
        r.app_version = d.app_version;
        r.language = d.language;
        r.latitude = d.latitude;
        r.longitude = d.longitude;
        r.sdk_version = d.sdk_version;
        r.global_sequence_id = d.global_sequence_id;
        r.event_sequence_id = d.event_sequence_id;
        r.event_name = d.event_name;
        r.path = d.path;
        r.title = d.title;
        r.text_value = d.text_value;
        r.xpath = d.xpath;
        r.attributes = d.attributes;
        Ok(r)
    }
}
