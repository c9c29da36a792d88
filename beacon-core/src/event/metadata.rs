//! Point-in-time view of every enrichment provider.

use super::types::AppState;

/// Values read once per event from the provider snapshots.
///
/// The tracker assembles one of these from the device, session, user and
/// network providers immediately before finalizing a builder, so every field
/// of a record comes from a single consistent read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataSnapshot {
    pub device_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub user_key: Option<String>,
    pub platform: Option<String>,
    pub platform_version: Option<String>,
    pub domain: Option<String>,
    pub app_state: Option<AppState>,
    pub network_state: Option<String>,
    pub app_channel: Option<String>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub device_brand: Option<String>,
    pub device_model: Option<String>,
    pub device_type: Option<String>,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub language: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub sdk_version: Option<String>,
}
