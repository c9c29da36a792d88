//! # beacon-core
//!
//! Foundation crate for the Beacon event pipeline.
//! Defines the event model, the plugin registry, errors, config, and the
//! request/result types that plugins are registered under.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod event;
pub mod registry;
pub mod requests;
pub mod sync;

// Re-export the most commonly used types at the crate root.
pub use config::TrackerConfig;
pub use errors::{BeaconError, BeaconResult};
pub use event::{EventBuilder, EventRecord, EventType, SendPolicy, StoreCategory};
pub use registry::{Handler, HandlerFactory, Module, Registry};
