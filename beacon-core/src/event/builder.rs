//! Mutable build request. Owned by the build actor until finalized.

use std::collections::{BTreeMap, BTreeSet};

use super::field::RecordField;
use super::metadata::MetadataSnapshot;
use super::record::{EventRecord, EventSequenceId};
use super::types::{EventType, SendPolicy};

/// Accumulates one event before enrichment.
///
/// Producers fill in the payload; interceptors may mutate it; the actor
/// consumes it with [`EventBuilder::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventBuilder {
    event_type: EventType,
    send_policy: Option<SendPolicy>,
    timestamp: Option<i64>,
    event_name: Option<String>,
    path: Option<String>,
    title: Option<String>,
    text_value: Option<String>,
    xpath: Option<String>,
    attributes: BTreeMap<String, String>,
    redacted: BTreeSet<RecordField>,
}

impl EventBuilder {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            send_policy: None,
            timestamp: None,
            event_name: None,
            path: None,
            title: None,
            text_value: None,
            xpath: None,
            attributes: BTreeMap::new(),
            redacted: BTreeSet::new(),
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::new(EventType::Custom).with_event_name(name)
    }

    pub fn page(path: impl Into<String>) -> Self {
        Self::new(EventType::Page).with_path(path)
    }

    pub fn visit() -> Self {
        Self::new(EventType::Visit)
    }

    pub fn app_closed() -> Self {
        Self::new(EventType::AppClosed)
    }

    pub fn login_user_attributes(attributes: BTreeMap<String, String>) -> Self {
        Self::new(EventType::LoginUserAttributes).with_attributes(attributes)
    }

    pub fn visitor_attributes(attributes: BTreeMap<String, String>) -> Self {
        Self::new(EventType::VisitorAttributes).with_attributes(attributes)
    }

    pub fn view_click(path: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self::new(EventType::ViewClick).with_path(path).with_xpath(xpath)
    }

    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text_value(mut self, text: impl Into<String>) -> Self {
        self.text_value = Some(text.into());
        self
    }

    pub fn with_xpath(mut self, xpath: impl Into<String>) -> Self {
        self.xpath = Some(xpath.into());
        self
    }

    pub fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    pub fn with_send_policy(mut self, policy: SendPolicy) -> Self {
        self.send_policy = Some(policy);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: BTreeMap<String, String>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn event_name(&self) -> Option<&str> {
        self.event_name.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.attributes
    }

    pub fn set_event_name(&mut self, name: Option<String>) {
        self.event_name = name;
    }

    pub fn set_path(&mut self, path: Option<String>) {
        self.path = path;
    }

    pub fn set_send_policy(&mut self, policy: SendPolicy) {
        self.send_policy = Some(policy);
    }

    /// Policy the record will carry: producer override, else the type default.
    pub fn send_policy(&self) -> SendPolicy {
        self.send_policy
            .unwrap_or_else(|| self.event_type.default_policy())
    }

    /// Strip `field` from the finalized record regardless of provider value.
    pub fn redact(&mut self, field: RecordField) {
        self.redacted.insert(field);
    }

    pub fn is_redacted(&self, field: RecordField) -> bool {
        self.redacted.contains(&field)
    }

    /// Add attributes the producer did not set itself. Producer keys win.
    pub fn merge_missing_attributes(&mut self, extra: &BTreeMap<String, String>) {
        for (k, v) in extra {
            self.attributes
                .entry(k.clone())
                .or_insert_with(|| v.clone());
        }
    }

    /// Consume the builder into an immutable record.
    pub fn finalize(
        self,
        meta: &MetadataSnapshot,
        sequence: EventSequenceId,
        now_millis: i64,
    ) -> EventRecord {
        let mut record = EventRecord::empty(self.event_type, self.timestamp.unwrap_or(now_millis));
        record.send_policy = self
            .send_policy
            .unwrap_or_else(|| self.event_type.default_policy());

        record.device_id = meta.device_id.clone();
        record.session_id = meta.session_id.clone();
        record.user_id = meta.user_id.clone();
        record.user_key = meta.user_key.clone();
        record.platform = meta.platform.clone();
        record.platform_version = meta.platform_version.clone();
        record.domain = meta.domain.clone();
        record.app_state = meta.app_state;
        record.network_state = meta.network_state.clone();
        record.app_channel = meta.app_channel.clone();
        record.screen_width = meta.screen_width;
        record.screen_height = meta.screen_height;
        record.device_brand = meta.device_brand.clone();
        record.device_model = meta.device_model.clone();
        record.device_type = meta.device_type.clone();
        record.app_name = meta.app_name.clone();
        record.app_version = meta.app_version.clone();
        record.language = meta.language.clone();
        record.latitude = meta.latitude;
        record.longitude = meta.longitude;
        record.sdk_version = meta.sdk_version.clone();

        record.global_sequence_id = sequence.global;
        record.event_sequence_id = sequence.event_type;

        record.event_name = self.event_name;
        record.path = self.path;
        record.title = self.title;
        record.text_value = self.text_value;
        record.xpath = self.xpath;
        record.attributes = self.attributes;

        for field in &self.redacted {
            record.clear_field(*field);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> MetadataSnapshot {
        MetadataSnapshot {
            device_id: Some("dev-1".into()),
            session_id: Some("sess-1".into()),
            language: Some("en".into()),
            screen_width: Some(1080),
            ..Default::default()
        }
    }

    #[test]
    fn finalize_copies_metadata_and_sequence() {
        let record = EventBuilder::custom("purchase")
            .with_attribute("sku", "42")
            .finalize(&meta(), EventSequenceId { global: 7, event_type: 3 }, 1_000);

        assert_eq!(record.event_type, EventType::Custom);
        assert_eq!(record.send_policy, SendPolicy::Batch);
        assert_eq!(record.timestamp, 1_000);
        assert_eq!(record.device_id.as_deref(), Some("dev-1"));
        assert_eq!(record.global_sequence_id, 7);
        assert_eq!(record.event_sequence_id, 3);
        assert_eq!(record.attributes.get("sku").map(String::as_str), Some("42"));
    }

    #[test]
    fn redacted_fields_are_cleared() {
        let mut builder = EventBuilder::page("/home");
        builder.redact(RecordField::Language);
        builder.redact(RecordField::ScreenWidth);
        let record = builder.finalize(&meta(), EventSequenceId::default(), 0);
        assert!(record.language.is_none());
        assert!(record.screen_width.is_none());
        assert_eq!(record.session_id.as_deref(), Some("sess-1"));
    }

    #[test]
    fn producer_attributes_win_over_merged() {
        let mut builder = EventBuilder::custom("x").with_attribute("k", "mine");
        let mut general = BTreeMap::new();
        general.insert("k".to_string(), "global".to_string());
        general.insert("other".to_string(), "g".to_string());
        builder.merge_missing_attributes(&general);
        assert_eq!(builder.attributes()["k"], "mine");
        assert_eq!(builder.attributes()["other"], "g");
    }

    #[test]
    fn policy_override_wins() {
        let record = EventBuilder::custom("now")
            .with_send_policy(SendPolicy::Instant)
            .with_timestamp(5)
            .finalize(&meta(), EventSequenceId::default(), 99);
        assert_eq!(record.send_policy, SendPolicy::Instant);
        assert_eq!(record.timestamp, 5);
    }
}
