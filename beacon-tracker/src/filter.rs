//! Exclusion and field-redaction rules applied by the build actor.

use std::collections::HashSet;

use beacon_core::config::FilterConfig;
use beacon_core::event::{EventBuilder, EventType, RecordField};
use tracing::warn;

/// Why an event was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    EventType,
    EventName,
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathRule {
    Exact(String),
    Prefix(String),
}

impl PathRule {
    fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(raw.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => p == path,
            Self::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// Compiled form of `[filter]`.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    event_types: HashSet<EventType>,
    event_names: HashSet<String>,
    paths: Vec<PathRule>,
    ignored_fields: Vec<RecordField>,
}

impl EventFilter {
    /// Entries that fail to parse are logged and ignored.
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut event_types = HashSet::new();
        for raw in &config.excluded_event_types {
            match raw.parse::<EventType>() {
                Ok(t) => {
                    event_types.insert(t);
                }
                Err(e) => warn!(entry = %raw, error = %e, "ignoring excluded event type"),
            }
        }

        let mut ignored_fields = Vec::new();
        for raw in &config.ignored_fields {
            match raw.parse::<RecordField>() {
                Ok(f) if !ignored_fields.contains(&f) => ignored_fields.push(f),
                Ok(_) => {}
                Err(e) => warn!(entry = %raw, error = %e, "ignoring redacted field"),
            }
        }

        Self {
            event_types,
            event_names: config.excluded_event_names.iter().cloned().collect(),
            paths: config
                .excluded_paths
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| PathRule::parse(p))
                .collect(),
            ignored_fields,
        }
    }

    /// The first rule that excludes `builder`, if any.
    pub fn exclusion(&self, builder: &EventBuilder) -> Option<Exclusion> {
        if self.event_types.contains(&builder.event_type()) {
            return Some(Exclusion::EventType);
        }
        if let Some(name) = builder.event_name() {
            if self.event_names.contains(name) {
                return Some(Exclusion::EventName);
            }
        }
        if let Some(path) = builder.path() {
            if self.paths.iter().any(|rule| rule.matches(path)) {
                return Some(Exclusion::Path);
            }
        }
        None
    }

    /// Mark every configured field for removal at finalization.
    pub fn redact(&self, builder: &mut EventBuilder) {
        for field in &self.ignored_fields {
            builder.redact(*field);
        }
    }

    pub fn ignored_fields(&self) -> &[RecordField] {
        &self.ignored_fields
    }
}
