use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::errors::ConfigError;

/// Wire codec used for stored rows and request bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    Json,
    #[default]
    Protobuf,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Protobuf => f.write_str("protobuf"),
        }
    }
}

impl FromStr for CodecKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "protobuf" | "proto" => Ok(Self::Protobuf),
            other => Err(ConfigError::ValidationFailed {
                field: "delivery.codec".to_string(),
                message: format!("unknown codec '{other}'"),
            }),
        }
    }
}

/// Delivery engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Seconds between scheduled flushes. 0 flushes after every insert.
    pub flush_interval_secs: u64,
    /// Rows per request.
    pub batch_size: usize,
    /// Inserts that trigger an eager flush.
    pub flush_threshold: usize,
    /// Worker threads for instant sends.
    pub io_workers: usize,
    /// Pending instant sends before falling back to the queue.
    pub io_queue_capacity: usize,
    /// Daily cellular budget for batch rows, in megabytes.
    pub cellular_data_limit_mb: u64,
    pub sweep_interval_secs: u64,
    pub codec: CodecKind,
    /// Compress and obfuscate request bodies.
    pub encrypt_body: bool,
}

impl DeliveryConfig {
    pub fn cellular_data_limit_bytes(&self) -> u64 {
        self.cellular_data_limit_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: defaults::DEFAULT_FLUSH_INTERVAL_SECS,
            batch_size: defaults::DEFAULT_BATCH_SIZE,
            flush_threshold: defaults::DEFAULT_FLUSH_THRESHOLD,
            io_workers: defaults::DEFAULT_IO_WORKERS,
            io_queue_capacity: defaults::DEFAULT_IO_QUEUE_CAPACITY,
            cellular_data_limit_mb: defaults::DEFAULT_CELLULAR_DATA_LIMIT_MB,
            sweep_interval_secs: defaults::DEFAULT_SWEEP_INTERVAL_SECS,
            codec: CodecKind::default(),
            encrypt_body: defaults::DEFAULT_ENCRYPT_BODY,
        }
    }
}
