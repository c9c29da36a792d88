pub mod defaults;
pub mod delivery_config;
pub mod filter_config;
pub mod storage_config;
pub mod tracker_config;
pub mod transport_config;

pub use delivery_config::{CodecKind, DeliveryConfig};
pub use filter_config::FilterConfig;
pub use storage_config::StorageConfig;
pub use tracker_config::TrackerConfig;
pub use transport_config::TransportConfig;
