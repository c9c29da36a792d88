//! The immutable event record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::field::RecordField;
use super::types::{AppState, EventType, SendPolicy, StoreCategory};

/// Global and per-type sequence numbers assigned at finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSequenceId {
    pub global: i64,
    pub event_type: i64,
}

/// One finished event. Constructed only through [`super::EventBuilder`];
/// never mutated after the build actor hands it off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_type: EventType,
    pub send_policy: SendPolicy,
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_state: Option<AppState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,

    #[serde(default)]
    pub global_sequence_id: i64,
    #[serde(default)]
    pub event_sequence_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl EventRecord {
    /// A bare record of the given type with every optional field empty.
    pub fn empty(event_type: EventType, timestamp: i64) -> Self {
        Self {
            event_type,
            send_policy: event_type.default_policy(),
            timestamp,
            device_id: None,
            session_id: None,
            user_id: None,
            user_key: None,
            platform: None,
            platform_version: None,
            domain: None,
            app_state: None,
            network_state: None,
            app_channel: None,
            screen_width: None,
            screen_height: None,
            device_brand: None,
            device_model: None,
            device_type: None,
            app_name: None,
            app_version: None,
            language: None,
            latitude: None,
            longitude: None,
            sdk_version: None,
            global_sequence_id: 0,
            event_sequence_id: 0,
            event_name: None,
            path: None,
            title: None,
            text_value: None,
            xpath: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn store_category(&self) -> StoreCategory {
        self.event_type.store_category()
    }

    pub fn sequence(&self) -> EventSequenceId {
        EventSequenceId {
            global: self.global_sequence_id,
            event_type: self.event_sequence_id,
        }
    }

    pub(crate) fn clear_field(&mut self, field: RecordField) {
        match field {
            RecordField::PlatformVersion => self.platform_version = None,
            RecordField::Domain => self.domain = None,
            RecordField::NetworkState => self.network_state = None,
            RecordField::AppChannel => self.app_channel = None,
            RecordField::ScreenWidth => self.screen_width = None,
            RecordField::ScreenHeight => self.screen_height = None,
            RecordField::DeviceBrand => self.device_brand = None,
            RecordField::DeviceModel => self.device_model = None,
            RecordField::DeviceType => self.device_type = None,
            RecordField::AppName => self.app_name = None,
            RecordField::AppVersion => self.app_version = None,
            RecordField::Language => self.language = None,
            RecordField::Latitude => self.latitude = None,
            RecordField::Longitude => self.longitude = None,
            RecordField::SdkVersion => self.sdk_version = None,
        }
    }
}
