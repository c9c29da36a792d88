//! Event model: types, the immutable record, the mutable builder, and the
//! metadata snapshot the builder is finalized against.

pub mod builder;
pub mod field;
pub mod metadata;
pub mod record;
pub mod types;

pub use builder::EventBuilder;
pub use field::RecordField;
pub use metadata::MetadataSnapshot;
pub use record::{EventRecord, EventSequenceId};
pub use types::{AppState, EventType, SendPolicy, StoreCategory};
