//! Raw SQL operations. Callers own the transaction.

pub mod event_ops;
pub mod kv_ops;
