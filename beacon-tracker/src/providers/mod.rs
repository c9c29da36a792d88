//! Enrichment providers.
//!
//! Each provider publishes whole `Arc` snapshots, so a record built from
//! [`Providers::snapshot`] never mixes values from two updates.

pub mod device;
pub mod network;
pub mod session;
pub mod user;

pub use device::{DeviceInfo, DeviceProvider};
pub use network::{MemoryProvider, NetworkProvider, NetworkState};
pub use session::{SessionProvider, SessionState};
pub use user::{UserProvider, UserState};

use beacon_core::constants::{PLATFORM, SDK_VERSION};
use beacon_core::event::MetadataSnapshot;

pub struct Providers {
    pub device: DeviceProvider,
    pub session: SessionProvider,
    pub user: UserProvider,
    pub network: NetworkProvider,
    pub memory: MemoryProvider,
    channel: String,
}

impl Providers {
    pub fn new(
        device: DeviceProvider,
        session: SessionProvider,
        user: UserProvider,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            device,
            session,
            user,
            network: NetworkProvider::default(),
            memory: MemoryProvider::default(),
            channel: channel.into(),
        }
    }

    /// Read every provider once.
    pub fn snapshot(&self) -> MetadataSnapshot {
        let info = self.device.info();
        let session = self.session.current();
        let user = self.user.current();
        let network = self.network.state();

        MetadataSnapshot {
            device_id: Some(self.device.device_id().to_string()),
            session_id: Some(session.session_id.clone()),
            user_id: user.user_id.clone(),
            user_key: user.user_key.clone(),
            platform: Some(PLATFORM.to_string()),
            platform_version: info.platform_version.clone(),
            domain: info.domain.clone(),
            app_state: Some(session.app_state),
            network_state: Some(network.as_str().to_string()),
            app_channel: Some(self.channel.clone()),
            screen_width: info.screen_width,
            screen_height: info.screen_height,
            device_brand: info.device_brand.clone(),
            device_model: info.device_model.clone(),
            device_type: info.device_type.clone(),
            app_name: info.app_name.clone(),
            app_version: info.app_version.clone(),
            language: info.language.clone(),
            latitude: user.location.map(|(lat, _)| lat),
            longitude: user.location.map(|(_, lon)| lon),
            sdk_version: Some(SDK_VERSION.to_string()),
        }
    }
}
