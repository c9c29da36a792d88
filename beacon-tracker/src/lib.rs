//! # beacon-tracker
//!
//! The running pipeline: a single build actor turns [`EventBuilder`]s into
//! records, the delivery engine sends or queues them, and a scheduler
//! flushes the durable queue to the collector.
//!
//! ```no_run
//! use beacon_core::config::TrackerConfig;
//! use beacon_tracker::Tracker;
//!
//! let tracker = Tracker::start(TrackerConfig::for_project("my-project", "/tmp/beacon"))
//!     .expect("tracker config is valid");
//! tracker.track_page("/home", Some("Home"));
//! tracker.shutdown();
//! ```
//!
//! [`EventBuilder`]: beacon_core::event::EventBuilder

pub mod actor;
pub mod context;
pub mod delivery;
pub mod filter;
pub mod interceptor;
pub mod logging;
pub mod migration;
pub mod providers;
pub mod tracker;

mod util;

pub use context::{ContextBuilder, TrackerContext};
pub use delivery::{FlushReport, FlushStop};
pub use filter::EventFilter;
pub use interceptor::{BuildDecision, BuildInterceptor, FnInterceptor, InterceptorChain};
pub use providers::{DeviceInfo, NetworkState};
pub use tracker::{Tracker, TrackerBuilder};
