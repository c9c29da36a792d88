//! Redactable metadata fields.

use std::str::FromStr;

use crate::errors::ConfigError;

/// Metadata fields a host may strip from every outgoing record.
/// Identity and sequencing fields are not redactable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordField {
    PlatformVersion,
    Domain,
    NetworkState,
    AppChannel,
    ScreenWidth,
    ScreenHeight,
    DeviceBrand,
    DeviceModel,
    DeviceType,
    AppName,
    AppVersion,
    Language,
    Latitude,
    Longitude,
    SdkVersion,
}

impl RecordField {
    pub const ALL: [RecordField; 15] = [
        RecordField::PlatformVersion,
        RecordField::Domain,
        RecordField::NetworkState,
        RecordField::AppChannel,
        RecordField::ScreenWidth,
        RecordField::ScreenHeight,
        RecordField::DeviceBrand,
        RecordField::DeviceModel,
        RecordField::DeviceType,
        RecordField::AppName,
        RecordField::AppVersion,
        RecordField::Language,
        RecordField::Latitude,
        RecordField::Longitude,
        RecordField::SdkVersion,
    ];

    /// Wire name, matching the camelCase JSON key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlatformVersion => "platformVersion",
            Self::Domain => "domain",
            Self::NetworkState => "networkState",
            Self::AppChannel => "appChannel",
            Self::ScreenWidth => "screenWidth",
            Self::ScreenHeight => "screenHeight",
            Self::DeviceBrand => "deviceBrand",
            Self::DeviceModel => "deviceModel",
            Self::DeviceType => "deviceType",
            Self::AppName => "appName",
            Self::AppVersion => "appVersion",
            Self::Language => "language",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::SdkVersion => "sdkVersion",
        }
    }
}

impl FromStr for RecordField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::ValidationFailed {
                field: "filter.ignored_fields".to_string(),
                message: format!("unknown field '{s}'"),
            })
    }
}
