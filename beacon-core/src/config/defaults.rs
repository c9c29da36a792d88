// Single source of truth for all default values.

// --- Tracker ---
pub const DEFAULT_SERVER_HOST: &str = "https://collect.beacon.dev";
pub const DEFAULT_CHANNEL: &str = "default";
pub const DEFAULT_DATA_DIR: &str = "beacon-data";
pub const DEFAULT_SESSION_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_DATA_COLLECTION_ENABLED: bool = true;
pub const DEFAULT_DEBUG: bool = false;

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "beacon-events.db";
pub const DEFAULT_LEGACY_DB_FILENAME: &str = "beacon-legacy.db";
pub const DEFAULT_MAX_ROW_BYTES: usize = 2 * 1024 * 1024; // 2 MB
pub const DEFAULT_MAX_BATCH_BYTES: usize = 2 * 1024 * 1024; // 2 MB
pub const DEFAULT_MAX_STORED_ROWS: usize = 50_000;
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;
pub const DEFAULT_LEGACY_MAX_BATCHES: usize = 50;
pub const DEFAULT_LEGACY_BUDGET_MS: u64 = 20_000; // 20 s

// --- Delivery ---
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_BATCH_SIZE: usize = 300;
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;
pub const DEFAULT_IO_WORKERS: usize = 2;
pub const DEFAULT_IO_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_CELLULAR_DATA_LIMIT_MB: u64 = 10;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3_600; // 1 hour
pub const DEFAULT_ENCRYPT_BODY: bool = false;

// --- Transport ---
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_RETRIES: u32 = 1;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

// --- Logging ---
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const LOG_ENV_VAR: &str = "BEACON_LOG";
pub const ENV_PREFIX: &str = "BEACON_";
