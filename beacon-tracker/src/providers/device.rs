//! Static device and app description plus the persistent device id.

use std::sync::{Arc, PoisonError, RwLock};

use beacon_core::errors::StorageError;
use beacon_core::registry::Registry;
use beacon_core::requests::{DeviceId, DeviceIdRequest};
use beacon_storage::PersistentCounters;
use tracing::{debug, warn};

/// Host-supplied description of the device and application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
    pub platform_version: Option<String>,
    pub domain: Option<String>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub device_brand: Option<String>,
    pub device_model: Option<String>,
    pub device_type: Option<String>,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub language: Option<String>,
}

pub struct DeviceProvider {
    device_id: String,
    info: RwLock<Arc<DeviceInfo>>,
}

impl DeviceProvider {
    /// Resolve the device id once. A registered `DeviceIdRequest` plugin
    /// supplies the id for a fresh install; otherwise a random id is
    /// generated. Either way the first stored id wins across processes.
    pub fn resolve(
        registry: &Registry,
        counters: &PersistentCounters,
        info: DeviceInfo,
    ) -> Result<Self, StorageError> {
        let device_id = counters.device_id_or_init(|| vendor_device_id(registry))?;
        Ok(Self {
            device_id,
            info: RwLock::new(Arc::new(info)),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn info(&self) -> Arc<DeviceInfo> {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole description, e.g. after a screen rotation.
    pub fn update(&self, info: DeviceInfo) {
        *self.info.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(info);
    }
}

fn vendor_device_id(registry: &Registry) -> String {
    if registry.contains::<DeviceIdRequest, DeviceId>() {
        match registry.execute::<DeviceIdRequest, DeviceId>(DeviceIdRequest) {
            Ok(DeviceId(id)) if !id.is_empty() => {
                debug!("device id supplied by plugin");
                return id;
            }
            Ok(_) => warn!("device id plugin returned an empty id"),
            Err(e) => warn!(error = %e, "device id plugin failed"),
        }
    }
    uuid::Uuid::new_v4().to_string()
}
