//! Delivery engine: instant sends on a bounded I/O pool, batched flushes on
//! a scheduler thread, both reconciled against the durable queue.

pub mod engine;
pub mod io_pool;
pub mod scheduler;
pub mod sender;
pub mod wire;

pub use engine::DeliveryEngine;
pub use scheduler::{Scheduler, SchedulerSignal};
pub use sender::{BatchSender, FlushReport, FlushStop, SendOutcome};
