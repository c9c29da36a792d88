//! Bounded worker pool for instant sends.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use beacon_core::errors::{BeaconResult, BuildError};
use beacon_core::requests::QueueInsert;
use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, warn};

use super::sender::{BatchSender, SendOutcome};

/// One encoded instant-policy record awaiting its own request.
#[derive(Debug, Clone)]
pub struct InstantJob {
    pub row: QueueInsert,
}

pub struct IoPool {
    sender: RwLock<Option<Sender<InstantJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl IoPool {
    pub fn spawn(workers: usize, capacity: usize, batch_sender: Arc<BatchSender>) -> BeaconResult<Self> {
        let (tx, rx) = bounded::<InstantJob>(capacity.max(1));
        let mut handles = Vec::with_capacity(workers.max(1));
        for index in 0..workers.max(1) {
            let rx = rx.clone();
            let batch_sender = batch_sender.clone();
            let name = format!("beacon-io-{index}");
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    for job in rx.iter() {
                        run_instant(&batch_sender, job);
                    }
                })
                .map_err(|e| BuildError::ThreadSpawn {
                    name,
                    message: e.to_string(),
                })?;
            handles.push(handle);
        }
        Ok(Self {
            sender: RwLock::new(Some(tx)),
            workers: Mutex::new(handles),
        })
    }

    /// Hand a job to a worker. Returns it when the pool is saturated or
    /// shut down so the caller can fall back to the queue.
    pub fn try_submit(&self, job: InstantJob) -> Result<(), InstantJob> {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx.try_send(job).map_err(|e| match e {
                TrySendError::Full(job) | TrySendError::Disconnected(job) => job,
            }),
            None => Err(job),
        }
    }

    /// Close the channel and wait for workers to finish queued jobs.
    pub fn shutdown(&self) {
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let handles: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("io worker panicked");
            }
        }
    }
}

fn run_instant(batch_sender: &BatchSender, job: InstantJob) {
    match batch_sender.send_rows(vec![job.row.data.clone()]) {
        Ok(SendOutcome::Sent { .. }) => debug!(category = ?job.row.category, "instant event sent"),
        Ok(SendOutcome::NothingDecodable) => warn!("instant event undecodable, dropped"),
        Err(e) => {
            debug!(error = %e, "instant send failed, queueing");
            batch_sender.enqueue(job.row);
        }
    }
}
