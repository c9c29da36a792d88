use serde::{Deserialize, Serialize};

/// Exclusion and redaction rules applied by the build actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Event type names (e.g. `"PAGE"`) dropped before finalization.
    pub excluded_event_types: Vec<String>,
    pub excluded_event_names: Vec<String>,
    /// Page paths. A trailing `*` matches by prefix.
    pub excluded_paths: Vec<String>,
    /// Metadata fields (camelCase wire names) stripped from every record.
    pub ignored_fields: Vec<String>,
}
