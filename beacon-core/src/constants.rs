/// Beacon library version, reported as `sdkVersion` on every event.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Platform tag reported on every event.
pub const PLATFORM: &str = "rust";

/// Rows fetched per flush request when the host reports memory pressure.
pub const LOW_MEMORY_BATCH_SIZE: usize = 3;

/// Rows moved per legacy-store migration batch.
pub const LEGACY_MIGRATION_BATCH: usize = 100;

/// Lower and upper bounds applied to the configured retention horizon.
pub const MIN_RETENTION_DAYS: u32 = 3;
pub const MAX_RETENTION_DAYS: u32 = 30;

/// Collector path segments: `/v3/projects/{project}/collect`.
pub const COLLECT_API_VERSION: &str = "v3";
pub const COLLECT_PATH_PROJECTS: &str = "projects";
pub const COLLECT_PATH_COLLECT: &str = "collect";

/// Query parameter carrying the send timestamp.
pub const SEND_TIME_PARAM: &str = "stm";

/// Media types advertised by the built-in codecs.
pub const MEDIA_TYPE_JSON: &str = "application/json";
pub const MEDIA_TYPE_PROTOBUF: &str = "application/protobuf";
