//! Flush scheduler thread: periodic and triggered flush cycles, staleness
//! sweeps, and the final flush on shutdown.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use beacon_core::errors::{BeaconResult, BuildError};
use beacon_core::requests::{QueueCommand, QueueReply};
use beacon_storage::SenderLock;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use super::sender::{BatchSender, FlushReport};
use crate::context::TrackerContext;
use crate::migration;

/// Tick used when the configured flush interval is 0 (every insert already
/// triggers a flush).
const IMMEDIATE_MODE_TICK: Duration = Duration::from_secs(1);

pub enum SchedulerSignal {
    /// Run a flush cycle; the reply carries `None` when another process
    /// holds the sender lock.
    Flush(Option<Sender<Option<FlushReport>>>),
    Shutdown,
}

pub struct Scheduler {
    trigger: Sender<SchedulerSignal>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn spawn(
        ctx: Arc<TrackerContext>,
        batch_sender: Arc<BatchSender>,
        lock: SenderLock,
        trigger: Sender<SchedulerSignal>,
        signals: Receiver<SchedulerSignal>,
    ) -> BeaconResult<Self> {
        let name = "beacon-scheduler".to_string();
        let mut worker = Worker {
            ctx,
            batch_sender,
            lock,
        };
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker.run(signals))
            .map_err(|e| BuildError::ThreadSpawn {
                name,
                message: e.to_string(),
            })?;
        Ok(Self {
            trigger,
            join: Mutex::new(Some(join)),
        })
    }

    pub fn trigger(&self) -> &Sender<SchedulerSignal> {
        &self.trigger
    }

    /// Ask for the final flush and wait for the thread to exit.
    pub fn shutdown(&self) {
        let handle = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        if self.trigger.send(SchedulerSignal::Shutdown).is_err() {
            debug!("scheduler already gone");
        }
        if handle.join().is_err() {
            warn!("scheduler thread panicked");
        }
    }
}

struct Worker {
    ctx: Arc<TrackerContext>,
    batch_sender: Arc<BatchSender>,
    lock: SenderLock,
}

impl Worker {
    fn run(&mut self, signals: Receiver<SchedulerSignal>) {
        if let Some(report) = migration::run_legacy_migration(&self.ctx) {
            debug!(migrated = report.migrated, completed = report.completed, "legacy migration pass");
        }
        self.sweep();

        let delivery = &self.ctx.config().delivery;
        let tick = match delivery.flush_interval_secs {
            0 => IMMEDIATE_MODE_TICK,
            secs => Duration::from_secs(secs),
        };
        let sweep_every = Duration::from_secs(delivery.sweep_interval_secs.max(1));
        let mut last_sweep = Instant::now();

        loop {
            match signals.recv_timeout(tick) {
                Ok(SchedulerSignal::Flush(reply)) => {
                    let report = self.flush(false);
                    if let Some(reply) = reply {
                        let _ = reply.send(report);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.flush(false);
                }
                Ok(SchedulerSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
            if last_sweep.elapsed() >= sweep_every {
                self.sweep();
                last_sweep = Instant::now();
            }
        }

        // Answer flush requests that raced with shutdown.
        for signal in signals.try_iter() {
            if let SchedulerSignal::Flush(Some(reply)) = signal {
                let _ = reply.send(None);
            }
        }
        let report = self.flush(true);
        info!(final_flush = ?report, "scheduler stopped");
    }

    fn flush(&mut self, final_attempt: bool) -> Option<FlushReport> {
        let batch_sender = &self.batch_sender;
        match self.lock.try_run(|| batch_sender.flush(final_attempt)) {
            Ok(Some(report)) => Some(report),
            Ok(None) => {
                debug!("sender lock held by another process, skipping flush");
                None
            }
            Err(e) => {
                warn!(error = %e, "sender lock unusable, skipping flush");
                None
            }
        }
    }

    fn sweep(&self) {
        let days = self.ctx.config().storage.effective_retention_days();
        match self
            .ctx
            .registry()
            .execute::<QueueCommand, QueueReply>(QueueCommand::EvictStale { older_than_days: days })
        {
            Ok(reply) => {
                let evicted = reply.affected().unwrap_or(0);
                if evicted > 0 {
                    info!(evicted, days, "stale events evicted");
                }
            }
            Err(e) => warn!(error = %e, "staleness sweep failed"),
        }
    }
}
