//! Host-facing entry point.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use beacon_core::config::TrackerConfig;
use beacon_core::errors::BeaconResult;
use beacon_core::event::EventBuilder;
use beacon_core::registry::Module;
use beacon_storage::SenderLock;
use crossbeam_channel::{bounded, unbounded};
use tracing::{info, warn};

use crate::actor::{ActorCommand, BuildActor, BuildPipeline};
use crate::context::{ContextBuilder, TrackerContext};
use crate::delivery::{BatchSender, DeliveryEngine, FlushReport, Scheduler, SchedulerSignal};
use crate::filter::EventFilter;
use crate::interceptor::{BuildInterceptor, InterceptorChain};
use crate::providers::{DeviceInfo, NetworkState};

/// Configures and starts a [`Tracker`].
pub struct TrackerBuilder {
    context: ContextBuilder,
    interceptors: InterceptorChain,
}

impl TrackerBuilder {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            context: ContextBuilder::new(config),
            interceptors: InterceptorChain::new(),
        }
    }

    /// Install a plugin module after the built-in ones.
    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.context = self.context.with_module(module);
        self
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn BuildInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_device_info(mut self, info: DeviceInfo) -> Self {
        self.context = self.context.with_device_info(info);
        self
    }

    /// Open storage, validate plugins, and spawn the pipeline threads.
    pub fn start(self) -> BeaconResult<Tracker> {
        let ctx = Arc::new(self.context.build()?);
        let lock = SenderLock::open(&ctx.config().sender_lock_path())?;

        let batch_sender = Arc::new(BatchSender::new(ctx.clone()));
        let (trigger, signals) = unbounded::<SchedulerSignal>();
        let delivery = Arc::new(DeliveryEngine::new(ctx.clone(), batch_sender.clone(), trigger.clone())?);
        let scheduler = Scheduler::spawn(ctx.clone(), batch_sender, lock, trigger, signals)?;

        let filter = EventFilter::from_config(&ctx.config().filter);
        let pipeline = BuildPipeline::new(ctx.clone(), self.interceptors, filter, delivery.clone());
        let actor = BuildActor::spawn(pipeline)?;

        info!(project_id = %ctx.config().project_id, "tracker started");
        Ok(Tracker {
            ctx,
            actor,
            delivery,
            scheduler,
        })
    }
}

/// A running event pipeline.
///
/// Every producer method returns immediately; work happens on the build
/// actor, the I/O pool, and the scheduler. Dropping the tracker shuts it
/// down the same way [`Tracker::shutdown`] does.
pub struct Tracker {
    ctx: Arc<TrackerContext>,
    actor: BuildActor,
    delivery: Arc<DeliveryEngine>,
    scheduler: Scheduler,
}

impl Tracker {
    pub fn builder(config: TrackerConfig) -> TrackerBuilder {
        TrackerBuilder::new(config)
    }

    /// Start with the built-in plugins only.
    pub fn start(config: TrackerConfig) -> BeaconResult<Self> {
        TrackerBuilder::new(config).start()
    }

    pub fn context(&self) -> &Arc<TrackerContext> {
        &self.ctx
    }

    // ---- Producers ----

    pub fn submit(&self, builder: EventBuilder) {
        self.actor.send(ActorCommand::Build(builder));
    }

    pub fn track_custom_event(&self, name: &str, attributes: BTreeMap<String, String>) {
        self.submit(EventBuilder::custom(name).with_attributes(attributes));
    }

    pub fn track_page(&self, path: &str, title: Option<&str>) {
        let mut builder = EventBuilder::page(path);
        if let Some(title) = title {
            builder = builder.with_title(title);
        }
        self.submit(builder);
    }

    pub fn set_login_user_attributes(&self, attributes: BTreeMap<String, String>) {
        self.submit(EventBuilder::login_user_attributes(attributes));
    }

    pub fn set_visitor_attributes(&self, attributes: BTreeMap<String, String>) {
        self.submit(EventBuilder::visitor_attributes(attributes));
    }

    // ---- Identity & context ----

    /// Switching to a different user starts a new session.
    pub fn set_login_user_id(&self, user_id: &str, user_key: Option<&str>) {
        self.actor.send(ActorCommand::SetUser {
            user_id: Some(user_id.to_string()),
            user_key: user_key.map(str::to_string),
        });
    }

    pub fn clean_login_user_id(&self) {
        self.actor.send(ActorCommand::SetUser {
            user_id: None,
            user_key: None,
        });
    }

    pub fn set_general_props(&self, props: BTreeMap<String, String>) {
        self.actor.send(ActorCommand::SetGeneralProps(props));
    }

    pub fn remove_general_props(&self, keys: &[&str]) {
        self.actor.send(ActorCommand::RemoveGeneralProps(
            keys.iter().map(|k| k.to_string()).collect(),
        ));
    }

    pub fn clear_general_props(&self) {
        self.actor.send(ActorCommand::ClearGeneralProps);
    }

    pub fn set_location(&self, latitude: f64, longitude: f64) {
        self.actor.send(ActorCommand::SetLocation(Some((latitude, longitude))));
    }

    pub fn clean_location(&self) {
        self.actor.send(ActorCommand::SetLocation(None));
    }

    pub fn set_data_collection_enabled(&self, enabled: bool) {
        self.ctx.set_data_collection_enabled(enabled);
    }

    pub fn set_device_info(&self, info: DeviceInfo) {
        self.ctx.providers().device.update(info);
    }

    // ---- Host lifecycle signals ----

    pub fn on_foreground(&self) {
        self.actor.send(ActorCommand::Foreground);
    }

    pub fn on_background(&self) {
        self.actor.send(ActorCommand::Background);
    }

    pub fn set_network_state(&self, state: NetworkState) {
        let previous = self.ctx.providers().network.state();
        self.ctx.providers().network.set_state(state);
        if !previous.is_connected() && state.is_connected() {
            self.flush();
        }
    }

    pub fn set_low_memory(&self, low: bool) {
        self.ctx.providers().memory.set_low(low);
    }

    // ---- Delivery control ----

    /// Request a flush cycle without waiting for it.
    pub fn flush(&self) {
        self.delivery.request_flush();
    }

    /// Run a flush cycle on the scheduler and wait for its report. `None`
    /// on timeout or when another process holds the sender lock.
    pub fn flush_and_wait(&self, timeout: Duration) -> Option<FlushReport> {
        let (tx, rx) = bounded(1);
        if self.scheduler.trigger().send(SchedulerSignal::Flush(Some(tx))).is_err() {
            return None;
        }
        rx.recv_timeout(timeout).ok().flatten()
    }

    /// Wait until every event submitted so far has been built.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.actor.wait_idle(timeout)
    }

    /// Rows currently waiting in the durable queue.
    pub fn pending_rows(&self) -> usize {
        match self.ctx.queue().count() {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "cannot count queued rows");
                0
            }
        }
    }

    /// Drain the actor, finish instant sends, run a final flush, and join
    /// every thread.
    pub fn shutdown(self) {
        drop(self);
    }

    fn stop(&self) {
        self.actor.shutdown();
        self.delivery.shutdown();
        self.scheduler.shutdown();
        self.ctx.cancel_token().cancel();
        info!("tracker stopped");
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop();
    }
}
