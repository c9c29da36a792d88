//! Encoding, sending, and queue reconciliation.

use std::sync::Arc;

use beacon_core::constants::LOW_MEMORY_BATCH_SIZE;
use beacon_core::errors::{BeaconError, BeaconResult, TransportError};
use beacon_core::event::{SendPolicy, StoreCategory};
use beacon_core::requests::{
    BodyEncodeRequest, EncodeRequest, EncodedPayload, FetchedBatch, QueueCommand, QueueInsert,
    QueueReply, WireRequest, WireResponse,
};
use tracing::{debug, info, warn};

use super::wire;
use crate::context::TrackerContext;
use crate::providers::NetworkState;
use crate::util::{day_index, now_millis};

/// Result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The collector accepted the request.
    Sent { records: usize, bytes: usize },
    /// No row in the batch could be decoded; nothing was sent.
    NothingDecodable,
}

/// Why a flush cycle stopped before the queue was empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStop {
    Offline,
    SendFailed,
    StorageFailed,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub requests: usize,
    pub sent_rows: usize,
    /// Rows deleted without sending because nothing in them was decodable.
    pub purged_rows: usize,
    /// Batch-policy rows held back by the daily cellular budget.
    pub cellular_limited: bool,
    pub stopped: Option<FlushStop>,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.stopped.is_none()
    }
}

/// Shared by the scheduler (flush cycles) and the I/O pool (instant sends).
pub struct BatchSender {
    ctx: Arc<TrackerContext>,
}

impl BatchSender {
    pub fn new(ctx: Arc<TrackerContext>) -> Self {
        Self { ctx }
    }

    /// Merge pre-encoded rows into one request and send it.
    pub fn send_rows(&self, rows: Vec<Vec<u8>>) -> BeaconResult<SendOutcome> {
        let registry = self.ctx.registry();
        let payload = registry.execute::<EncodeRequest, EncodedPayload>(EncodeRequest::Batch(rows))?;
        if payload.records == 0 {
            return Ok(SendOutcome::NothingDecodable);
        }
        let records = payload.records;

        let config = self.ctx.config();
        let send_time = now_millis();
        let mut request = wire::build_request(&config.server_host, &config.project_id, payload, send_time);
        if registry.contains::<BodyEncodeRequest, WireRequest>() {
            request = registry.execute::<BodyEncodeRequest, WireRequest>(BodyEncodeRequest(request))?;
        }
        let bytes = request.body.len();
        if config.debug {
            debug!(url = %request.url, records, bytes, "sending events");
        }

        let response = registry.execute::<WireRequest, WireResponse>(request)?;
        if !response.is_success() {
            return Err(TransportError::Rejected {
                status: response.status,
            }
            .into());
        }

        if self.ctx.providers().network.state() == NetworkState::Cellular {
            let day = day_index(send_time);
            if let Err(e) = self.ctx.counters().add_cellular_bytes(day, bytes as u64) {
                warn!(error = %e, "failed to record cellular usage");
            }
        }
        Ok(SendOutcome::Sent { records, bytes })
    }

    /// Store a row for a later flush. Storage failures are logged and the
    /// row is dropped.
    pub fn enqueue(&self, row: QueueInsert) -> Option<i64> {
        let policy = row.policy;
        match self
            .ctx
            .registry()
            .execute::<QueueCommand, QueueReply>(QueueCommand::Insert(row))
        {
            Ok(reply) => {
                let id = reply.inserted_id();
                if self.ctx.config().debug {
                    debug!(row_id = ?id, ?policy, "event saved");
                }
                id
            }
            Err(e) => {
                warn!(error = %e, ?policy, "event dropped, queue insert failed");
                None
            }
        }
    }

    /// Drain the queue: instant rows first, then batch rows, one request per
    /// fetched batch. Stops at the first failure and leaves the rows in place.
    pub fn flush(&self, final_attempt: bool) -> FlushReport {
        let mut report = FlushReport::default();
        for policy in SendPolicy::FLUSH_ORDER {
            if let Err(stop) = self.flush_policy(policy, final_attempt, &mut report) {
                report.stopped = Some(stop);
                break;
            }
        }
        if report.requests > 0 || report.stopped.is_some() {
            info!(
                requests = report.requests,
                sent = report.sent_rows,
                purged = report.purged_rows,
                stopped = ?report.stopped,
                "flush cycle finished"
            );
        }
        report
    }

    fn flush_policy(
        &self,
        policy: SendPolicy,
        final_attempt: bool,
        report: &mut FlushReport,
    ) -> Result<(), FlushStop> {
        let config = self.ctx.config();
        let providers = self.ctx.providers();
        loop {
            if !final_attempt && self.ctx.cancel_token().is_cancelled() {
                return Err(FlushStop::Cancelled);
            }
            let network = providers.network.state();
            if !network.is_connected() {
                debug!("offline, flush deferred");
                return Err(FlushStop::Offline);
            }
            if policy == SendPolicy::Batch
                && network == NetworkState::Cellular
                && self.cellular_budget_exhausted()
            {
                report.cellular_limited = true;
                return Ok(());
            }

            let limit = if providers.memory.is_low() {
                LOW_MEMORY_BATCH_SIZE
            } else {
                config.delivery.batch_size
            };
            let batch = self.fetch(policy, limit, config.storage.max_batch_bytes)?;
            let Some(category) = batch.category else {
                return Ok(());
            };
            if batch.is_empty() {
                return Ok(());
            }

            let row_count = batch.len();
            let max_row_id = batch.max_row_id;
            let rows = batch.rows.into_iter().map(|r| r.data).collect();
            match self.send_rows(rows) {
                Ok(SendOutcome::Sent { .. }) => {
                    report.requests += 1;
                    report.sent_rows += row_count;
                }
                Ok(SendOutcome::NothingDecodable) => {
                    warn!(rows = row_count, ?policy, "purging undecodable rows");
                    report.purged_rows += row_count;
                }
                Err(e) => {
                    warn!(error = %e, rows = row_count, ?policy, "send failed, rows retained");
                    return Err(FlushStop::SendFailed);
                }
            }
            self.delete_up_to(max_row_id, policy, category)?;
        }
    }

    fn fetch(&self, policy: SendPolicy, limit: usize, max_bytes: usize) -> Result<FetchedBatch, FlushStop> {
        let reply = self
            .ctx
            .registry()
            .execute::<QueueCommand, QueueReply>(QueueCommand::FetchOldest {
                policy,
                limit,
                max_bytes,
            })
            .map_err(|e| storage_stop(&e))?;
        reply.into_fetched().ok_or_else(|| {
            warn!("queue plugin answered fetch with an unexpected reply");
            FlushStop::StorageFailed
        })
    }

    fn delete_up_to(
        &self,
        row_id: i64,
        policy: SendPolicy,
        category: StoreCategory,
    ) -> Result<(), FlushStop> {
        self.ctx
            .registry()
            .execute::<QueueCommand, QueueReply>(QueueCommand::DeleteUpTo {
                row_id,
                policy,
                category,
            })
            .map(|_| ())
            .map_err(|e| storage_stop(&e))
    }

    fn cellular_budget_exhausted(&self) -> bool {
        let limit = self.ctx.config().delivery.cellular_data_limit_bytes();
        match self.ctx.counters().cellular_bytes(day_index(now_millis())) {
            Ok(used) => used >= limit,
            Err(e) => {
                warn!(error = %e, "cannot read cellular usage");
                false
            }
        }
    }
}

fn storage_stop(e: &BeaconError) -> FlushStop {
    warn!(error = %e, "queue unavailable, flush stopped");
    FlushStop::StorageFailed
}
