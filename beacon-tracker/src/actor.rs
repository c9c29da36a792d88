//! The event build actor.
//!
//! One dedicated thread drains an unbounded channel in FIFO order and owns
//! every build request while it is being turned into a record. Sequence ids
//! are therefore assigned in submission order. The actor never touches the
//! network; finished records go to the [`DeliveryEngine`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use beacon_core::errors::{BeaconResult, BuildError};
use beacon_core::event::{AppState, EventBuilder, EventRecord, EventType};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::context::TrackerContext;
use crate::delivery::DeliveryEngine;
use crate::filter::EventFilter;
use crate::interceptor::{BuildDecision, InterceptorChain};
use crate::util::now_millis;

pub enum ActorCommand {
    Build(EventBuilder),
    Foreground,
    Background,
    SetUser {
        user_id: Option<String>,
        user_key: Option<String>,
    },
    SetGeneralProps(BTreeMap<String, String>),
    RemoveGeneralProps(Vec<String>),
    ClearGeneralProps,
    SetLocation(Option<(f64, f64)>),
    /// Replies once every earlier command has been processed.
    Barrier(Sender<()>),
}

/// Everything one build needs, owned by the actor thread.
pub struct BuildPipeline {
    ctx: Arc<TrackerContext>,
    interceptors: InterceptorChain,
    filter: EventFilter,
    delivery: Arc<DeliveryEngine>,
}

impl BuildPipeline {
    pub fn new(
        ctx: Arc<TrackerContext>,
        interceptors: InterceptorChain,
        filter: EventFilter,
        delivery: Arc<DeliveryEngine>,
    ) -> Self {
        Self {
            ctx,
            interceptors,
            filter,
            delivery,
        }
    }

    pub fn handle(&self, command: ActorCommand) {
        match command {
            ActorCommand::Build(builder) => self.submit(builder),
            ActorCommand::Foreground => self.on_foreground(),
            ActorCommand::Background => self.on_background(),
            ActorCommand::SetUser { user_id, user_key } => self.set_user(user_id, user_key),
            ActorCommand::SetGeneralProps(props) => self
                .ctx
                .providers()
                .user
                .update(|u| u.general_props.extend(props)),
            ActorCommand::RemoveGeneralProps(keys) => self.ctx.providers().user.update(|u| {
                for key in &keys {
                    u.general_props.remove(key);
                }
            }),
            ActorCommand::ClearGeneralProps => {
                self.ctx.providers().user.update(|u| u.general_props.clear())
            }
            ActorCommand::SetLocation(location) => {
                self.ctx.providers().user.update(|u| u.location = location)
            }
            ActorCommand::Barrier(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn submit(&self, builder: EventBuilder) {
        if !self.ctx.data_collection_enabled() {
            debug!(event_type = %builder.event_type(), "data collection disabled, event dropped");
            return;
        }
        if let Some(reason) = self.filter.exclusion(&builder) {
            debug!(event_type = %builder.event_type(), ?reason, "event excluded");
            return;
        }
        if builder.event_type() == EventType::Visit {
            self.mark_visit_sent();
        } else if !self.visit_sent() {
            self.emit_visit();
        }
        self.build_and_deliver(builder);
    }

    fn build_and_deliver(&self, builder: EventBuilder) {
        if let Some(record) = self.build(builder) {
            self.delivery.deliver(record);
        }
    }

    /// Run one build request through interceptors, filters, and
    /// finalization. `None` means the event was dropped.
    pub fn build(&self, mut builder: EventBuilder) -> Option<EventRecord> {
        if self.interceptors.run_will_build(&mut builder) == BuildDecision::Drop {
            debug!(event_type = %builder.event_type(), "event dropped by interceptor");
            return None;
        }
        if let Some(reason) = self.filter.exclusion(&builder) {
            debug!(event_type = %builder.event_type(), ?reason, "event excluded");
            return None;
        }
        self.filter.redact(&mut builder);

        let providers = self.ctx.providers();
        if builder.event_type() == EventType::Custom {
            let user = providers.user.current();
            builder.merge_missing_attributes(&user.general_props);
        }

        let event_type = builder.event_type();
        let sequence = match self.ctx.counters().get_and_increment(event_type) {
            Ok(seq) => seq,
            Err(e) => {
                warn!(error = %e, %event_type, "event dropped, sequence counters unavailable");
                return None;
            }
        };
        let record = builder.finalize(&providers.snapshot(), sequence, now_millis());
        self.interceptors.run_did_build(&record);
        Some(record)
    }

    fn visit_sent(&self) -> bool {
        self.ctx.counters().visit_sent().unwrap_or_else(|e| {
            warn!(error = %e, "cannot read visit flag");
            true
        })
    }

    fn mark_visit_sent(&self) {
        if let Err(e) = self.ctx.counters().set_visit_sent(true) {
            warn!(error = %e, "cannot persist visit flag");
        }
    }

    fn emit_visit(&self) {
        self.mark_visit_sent();
        self.build_and_deliver(EventBuilder::visit());
    }

    fn refresh_session(&self) {
        if let Err(e) = self.ctx.providers().session.refresh(self.ctx.counters()) {
            warn!(error = %e, "session refresh failed");
        }
    }

    fn on_foreground(&self) {
        let counters = self.ctx.counters();
        let active = counters.increment_activity_count().unwrap_or_else(|e| {
            warn!(error = %e, "cannot update activity count");
            1
        });
        self.ctx.providers().session.set_app_state(AppState::Foreground);
        if active != 1 {
            return;
        }

        let interval_ms = (self.ctx.config().session_interval_secs as i64).saturating_mul(1000);
        match counters.latest_pause_time() {
            Ok(Some(paused_at)) if paused_at > 0 && now_millis() - paused_at >= interval_ms => {
                self.refresh_session()
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "cannot read pause time"),
        }
        if self.ctx.data_collection_enabled() && !self.visit_sent() {
            self.emit_visit();
        }
    }

    fn on_background(&self) {
        let counters = self.ctx.counters();
        let remaining = match counters.decrement_activity_count() {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "cannot update activity count");
                return;
            }
        };
        if remaining > 0 {
            return;
        }
        if let Err(e) = counters.set_latest_pause_time(now_millis()) {
            warn!(error = %e, "cannot persist pause time");
        }
        self.ctx.providers().session.set_app_state(AppState::Background);
        self.submit(EventBuilder::app_closed());
    }

    fn set_user(&self, user_id: Option<String>, user_key: Option<String>) {
        let counters = self.ctx.counters();
        let user_id = user_id.filter(|s| !s.is_empty());
        let user_key = user_key.filter(|s| !s.is_empty());

        let previous = match counters.set_user_id(user_id.as_deref()) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "cannot persist user id");
                None
            }
        };
        if let Err(e) = counters.set_user_key(user_key.as_deref()) {
            warn!(error = %e, "cannot persist user key");
        }
        self.ctx.providers().user.update(|u| {
            u.user_id = user_id.clone();
            u.user_key = user_key.clone();
        });

        if let (Some(new), Some(old)) = (&user_id, &previous) {
            if new != old {
                info!("login user changed, starting a new session");
                self.refresh_session();
                if self.ctx.data_collection_enabled() {
                    self.emit_visit();
                }
            }
        }
    }
}

/// Handle on the actor thread.
pub struct BuildActor {
    sender: Mutex<Option<Sender<ActorCommand>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl BuildActor {
    pub fn spawn(pipeline: BuildPipeline) -> BeaconResult<Self> {
        let (tx, rx) = unbounded::<ActorCommand>();
        let name = "beacon-build-actor".to_string();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(pipeline, rx))
            .map_err(|e| BuildError::ThreadSpawn {
                name,
                message: e.to_string(),
            })?;
        Ok(Self {
            sender: Mutex::new(Some(tx)),
            join: Mutex::new(Some(join)),
        })
    }

    /// Enqueue without blocking. Returns `false` once the actor is stopped.
    pub fn send(&self, command: ActorCommand) -> bool {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) if tx.send(command).is_ok() => true,
            _ => {
                debug!(error = %BuildError::ActorStopped, "command discarded");
                false
            }
        }
    }

    /// Wait until everything submitted before this call has been built.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let (tx, rx) = bounded(1);
        self.send(ActorCommand::Barrier(tx)) && rx.recv_timeout(timeout).is_ok()
    }

    /// Close the channel, let the actor drain it, and join.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handle = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("build actor panicked");
            }
        }
    }
}

fn run(pipeline: BuildPipeline, commands: Receiver<ActorCommand>) {
    for command in commands.iter() {
        pipeline.handle(command);
    }
    debug!("build actor drained");
}
