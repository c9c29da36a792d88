//! Everything the pipeline threads share. No global state: each tracker
//! (and each test) owns its own context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use beacon_codec::CodecModule;
use beacon_core::config::TrackerConfig;
use beacon_core::errors::BeaconResult;
use beacon_core::event::EventRecord;
use beacon_core::registry::{Module, Registry};
use beacon_core::requests::{
    DecodeRequest, EncodeRequest, EncodedPayload, QueueCommand, QueueReply, WireRequest,
    WireResponse,
};
use beacon_core::sync::CancellationToken;
use beacon_storage::{EventQueue, InstanceLock, PersistentCounters, StorageModule};
use beacon_transport::TransportModule;
use tracing::{debug, info};

use crate::providers::session::new_session_id;
use crate::providers::{
    DeviceInfo, DeviceProvider, Providers, SessionProvider, UserProvider,
};

pub struct TrackerContext {
    config: TrackerConfig,
    registry: Arc<Registry>,
    queue: Arc<EventQueue>,
    counters: Arc<PersistentCounters>,
    providers: Arc<Providers>,
    cancel: CancellationToken,
    data_collection: AtomicBool,
    instance: InstanceLock,
}

impl TrackerContext {
    pub fn builder(config: TrackerConfig) -> ContextBuilder {
        ContextBuilder::new(config)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Direct handle on the SQLite queue. Pipeline code goes through the
    /// registry; migration and diagnostics use this.
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn counters(&self) -> &Arc<PersistentCounters> {
        &self.counters
    }

    pub fn providers(&self) -> &Arc<Providers> {
        &self.providers
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether no other process shared the data directory at startup.
    pub fn is_first_process(&self) -> bool {
        self.instance.is_first()
    }

    pub fn data_collection_enabled(&self) -> bool {
        self.data_collection.load(Ordering::Acquire)
    }

    pub fn set_data_collection_enabled(&self, enabled: bool) {
        let previous = self.data_collection.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!(enabled, "data collection toggled");
        }
    }
}

/// Assembles a [`TrackerContext`]: opens storage, installs the built-in
/// modules followed by host modules, and validates the registry.
pub struct ContextBuilder {
    config: TrackerConfig,
    modules: Vec<Box<dyn Module>>,
    device_info: DeviceInfo,
}

impl ContextBuilder {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            modules: Vec::new(),
            device_info: DeviceInfo::default(),
        }
    }

    /// Host modules override built-in registrations for the same pair.
    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn with_device_info(mut self, info: DeviceInfo) -> Self {
        self.device_info = info;
        self
    }

    pub fn build(self) -> BeaconResult<TrackerContext> {
        let config = self.config;
        config.validate()?;

        let queue = Arc::new(EventQueue::open(&config.db_path(), &config.storage)?);
        let counters = Arc::new(PersistentCounters::new(queue.database().clone()));
        let instance = InstanceLock::acquire(&config.instance_lock_path(), || {
            let session_id = new_session_id();
            counters.reset_session_state(&session_id)?;
            info!(session_id = %session_id, "first process, session state reset");
            Ok(())
        })?;
        let cancel = CancellationToken::new();

        let mut registry = Registry::new();
        let builtins: [Box<dyn Module>; 3] = [
            Box::new(StorageModule::new(queue.clone())),
            Box::new(CodecModule::new(
                config.delivery.codec,
                config.delivery.encrypt_body,
            )),
            Box::new(TransportModule::new(&config.transport, cancel.clone())),
        ];
        for module in builtins.iter().chain(self.modules.iter()) {
            debug!(module = module.name(), "installing module");
            registry.install(module.as_ref());
        }
        registry.require::<QueueCommand, QueueReply>()?;
        registry.require::<EncodeRequest, EncodedPayload>()?;
        registry.require::<DecodeRequest, EventRecord>()?;
        registry.require::<WireRequest, WireResponse>()?;

        let device = DeviceProvider::resolve(&registry, &counters, self.device_info)?;
        let session = SessionProvider::load(&counters)?;
        let user = UserProvider::load(&counters)?;
        let providers = Providers::new(device, session, user, config.channel.clone());

        info!(
            project_id = %config.project_id,
            db = %config.db_path().display(),
            handlers = registry.len(),
            "tracker context ready"
        );

        Ok(TrackerContext {
            data_collection: AtomicBool::new(config.data_collection_enabled),
            config,
            registry: Arc::new(registry),
            queue,
            counters,
            providers: Arc::new(providers),
            cancel,
            instance,
        })
    }
}
