//! Routes finished records by send policy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use beacon_core::errors::BeaconResult;
use beacon_core::event::{EventRecord, SendPolicy};
use beacon_core::requests::{EncodeRequest, EncodedPayload, QueueInsert};
use crossbeam_channel::Sender;
use tracing::{debug, warn};

use super::io_pool::{InstantJob, IoPool};
use super::scheduler::SchedulerSignal;
use super::sender::BatchSender;
use crate::context::TrackerContext;

pub struct DeliveryEngine {
    ctx: Arc<TrackerContext>,
    batch_sender: Arc<BatchSender>,
    io_pool: IoPool,
    trigger: Sender<SchedulerSignal>,
    inserts_since_flush: AtomicUsize,
}

impl DeliveryEngine {
    pub fn new(
        ctx: Arc<TrackerContext>,
        batch_sender: Arc<BatchSender>,
        trigger: Sender<SchedulerSignal>,
    ) -> BeaconResult<Self> {
        let delivery = &ctx.config().delivery;
        let io_pool = IoPool::spawn(delivery.io_workers, delivery.io_queue_capacity, batch_sender.clone())?;
        Ok(Self {
            ctx,
            batch_sender,
            io_pool,
            trigger,
            inserts_since_flush: AtomicUsize::new(0),
        })
    }

    /// Encode once, then send now (`Instant`) or queue (`Batch`). Never
    /// performs network I/O on the calling thread.
    pub fn deliver(&self, record: EventRecord) {
        let category = record.store_category();
        let policy = record.send_policy;
        let created_at = record.timestamp;
        let event_type = record.event_type;

        let payload = match self
            .ctx
            .registry()
            .execute::<EncodeRequest, EncodedPayload>(EncodeRequest::One(record))
        {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, %event_type, "event dropped, encoding failed");
                return;
            }
        };
        let row = QueueInsert {
            category,
            policy,
            data: payload.bytes,
            created_at,
        };

        match policy {
            SendPolicy::Instant => self.deliver_instant(row),
            SendPolicy::Batch => self.deliver_batch(row),
        }
    }

    fn deliver_instant(&self, row: QueueInsert) {
        if !self.ctx.providers().network.state().is_connected() {
            self.batch_sender.enqueue(row);
            return;
        }
        if let Err(job) = self.io_pool.try_submit(InstantJob { row }) {
            debug!("io pool saturated, queueing instant event");
            self.batch_sender.enqueue(job.row);
        }
    }

    fn deliver_batch(&self, row: QueueInsert) {
        if self.batch_sender.enqueue(row).is_none() {
            return;
        }
        let delivery = &self.ctx.config().delivery;
        let pending = self.inserts_since_flush.fetch_add(1, Ordering::AcqRel) + 1;
        if delivery.flush_interval_secs == 0 || pending >= delivery.flush_threshold.max(1) {
            self.inserts_since_flush.store(0, Ordering::Release);
            self.request_flush();
        }
    }

    /// Non-blocking flush trigger.
    pub fn request_flush(&self) {
        if self.trigger.send(SchedulerSignal::Flush(None)).is_err() {
            debug!("scheduler stopped, flush request ignored");
        }
    }

    /// Stop accepting instant jobs and wait for in-flight ones.
    pub fn shutdown(&self) {
        self.io_pool.shutdown();
    }
}
