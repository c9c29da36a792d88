//! Top-level tracker configuration with layered resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{defaults, CodecKind, DeliveryConfig, FilterConfig, StorageConfig, TransportConfig};
use crate::errors::ConfigError;
use crate::event::{EventType, RecordField};

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`BEACON_*`)
/// 2. TOML file
/// 3. Compiled defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub project_id: String,
    pub server_host: String,
    pub channel: String,
    pub data_collection_enabled: bool,
    pub debug: bool,
    /// Background time after which a return to foreground starts a new session.
    pub session_interval_secs: u64,
    /// Directory holding the queue database, legacy store, and sender lock.
    pub data_dir: PathBuf,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
    pub transport: TransportConfig,
    pub filter: FilterConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            server_host: defaults::DEFAULT_SERVER_HOST.to_string(),
            channel: defaults::DEFAULT_CHANNEL.to_string(),
            data_collection_enabled: defaults::DEFAULT_DATA_COLLECTION_ENABLED,
            debug: defaults::DEFAULT_DEBUG,
            session_interval_secs: defaults::DEFAULT_SESSION_INTERVAL_SECS,
            data_dir: PathBuf::from(defaults::DEFAULT_DATA_DIR),
            storage: StorageConfig::default(),
            delivery: DeliveryConfig::default(),
            transport: TransportConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Minimal config for a project, everything else defaulted.
    pub fn for_project(project_id: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration: defaults, then `path` if given and present, then
    /// `BEACON_*` environment variables. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                tracing::debug!(path = %p.display(), "config file absent, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse a TOML string over the defaults (for testing and embedding).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    /// Pattern: `BEACON_PROJECT_ID`, `BEACON_DELIVERY_BATCH_SIZE`, etc.
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", defaults::ENV_PREFIX, name));

        if let Some(v) = var("PROJECT_ID") {
            self.project_id = v;
        }
        if let Some(v) = var("SERVER_HOST") {
            self.server_host = v;
        }
        if let Some(v) = var("CHANNEL") {
            self.channel = v;
        }
        if let Some(v) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        set_parsed(&mut self.debug, "DEBUG", var("DEBUG"));
        set_parsed(
            &mut self.data_collection_enabled,
            "DATA_COLLECTION_ENABLED",
            var("DATA_COLLECTION_ENABLED"),
        );
        set_parsed(
            &mut self.session_interval_secs,
            "SESSION_INTERVAL_SECS",
            var("SESSION_INTERVAL_SECS"),
        );

        set_parsed(
            &mut self.storage.max_stored_rows,
            "STORAGE_MAX_STORED_ROWS",
            var("STORAGE_MAX_STORED_ROWS"),
        );
        set_parsed(
            &mut self.storage.retention_days,
            "STORAGE_RETENTION_DAYS",
            var("STORAGE_RETENTION_DAYS"),
        );

        set_parsed(
            &mut self.delivery.flush_interval_secs,
            "DELIVERY_FLUSH_INTERVAL_SECS",
            var("DELIVERY_FLUSH_INTERVAL_SECS"),
        );
        set_parsed(
            &mut self.delivery.batch_size,
            "DELIVERY_BATCH_SIZE",
            var("DELIVERY_BATCH_SIZE"),
        );
        set_parsed(
            &mut self.delivery.flush_threshold,
            "DELIVERY_FLUSH_THRESHOLD",
            var("DELIVERY_FLUSH_THRESHOLD"),
        );
        set_parsed::<CodecKind>(&mut self.delivery.codec, "DELIVERY_CODEC", var("DELIVERY_CODEC"));
        set_parsed(
            &mut self.delivery.encrypt_body,
            "DELIVERY_ENCRYPT_BODY",
            var("DELIVERY_ENCRYPT_BODY"),
        );

        set_parsed(
            &mut self.transport.timeout_ms,
            "TRANSPORT_TIMEOUT_MS",
            var("TRANSPORT_TIMEOUT_MS"),
        );
        set_parsed(
            &mut self.transport.max_retries,
            "TRANSPORT_MAX_RETRIES",
            var("TRANSPORT_MAX_RETRIES"),
        );
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id.trim().is_empty() {
            return Err(invalid("project_id", "must not be empty"));
        }
        if !(self.server_host.starts_with("http://") || self.server_host.starts_with("https://")) {
            return Err(invalid("server_host", "must start with http:// or https://"));
        }
        if self.storage.max_row_bytes == 0 {
            return Err(invalid("storage.max_row_bytes", "must be greater than 0"));
        }
        if self.storage.max_batch_bytes < self.storage.max_row_bytes {
            return Err(invalid(
                "storage.max_batch_bytes",
                "must be at least storage.max_row_bytes",
            ));
        }
        if self.storage.max_stored_rows == 0 {
            return Err(invalid("storage.max_stored_rows", "must be greater than 0"));
        }
        if self.delivery.batch_size == 0 {
            return Err(invalid("delivery.batch_size", "must be greater than 0"));
        }
        if self.delivery.io_workers == 0 {
            return Err(invalid("delivery.io_workers", "must be greater than 0"));
        }
        if self.delivery.io_queue_capacity == 0 {
            return Err(invalid("delivery.io_queue_capacity", "must be greater than 0"));
        }
        if self.delivery.sweep_interval_secs == 0 {
            return Err(invalid("delivery.sweep_interval_secs", "must be greater than 0"));
        }
        if self.transport.timeout_ms == 0 {
            return Err(invalid("transport.timeout_ms", "must be greater than 0"));
        }
        if self.transport.initial_backoff_ms > self.transport.max_backoff_ms {
            return Err(invalid(
                "transport.initial_backoff_ms",
                "must not exceed transport.max_backoff_ms",
            ));
        }
        for name in &self.filter.excluded_event_types {
            name.parse::<EventType>()
                .map_err(|_| invalid("filter.excluded_event_types", &format!("unknown event type '{name}'")))?;
        }
        for name in &self.filter.ignored_fields {
            name.parse::<RecordField>()?;
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.db_filename)
    }

    pub fn legacy_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.legacy_db_filename)
    }

    pub fn sender_lock_path(&self) -> PathBuf {
        self.data_dir.join("sender.lock")
    }

    pub fn instance_lock_path(&self) -> PathBuf {
        self.data_dir.join("instance.lock")
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, name: &str, raw: Option<String>) {
    if let Some(raw) = raw {
        match raw.parse::<T>() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!(
                variable = %format!("{}{}", defaults::ENV_PREFIX, name),
                value = %raw,
                "ignoring unparseable environment override"
            ),
        }
    }
}
