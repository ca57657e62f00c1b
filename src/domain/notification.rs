use crate::error::DecodeError;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Ordered list of candidate field names for one logical field.
/// The first field holding a usable value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldChain(pub &'static [&'static str]);

pub const ID_FIELDS: FieldChain = FieldChain(&["ID", "id"]);
pub const TITLE_FIELDS: FieldChain = FieldChain(&["notification_title", "title", "Notification_Title"]);
pub const BODY_FIELDS: FieldChain = FieldChain(&["notification_message", "message", "Notification_Message"]);

impl FieldChain {
    /// Returns the first usable value as text.
    ///
    /// Non-empty strings and non-zero numbers are usable. Empty strings, zero,
    /// `null`, booleans and nested values fall through to the next candidate.
    #[must_use]
    pub fn first_text(&self, object: &Map<String, Value>) -> Option<String> {
        self.0.iter().find_map(|name| match object.get(*name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if !is_zero(n) => Some(n.to_string()),
            _ => None,
        })
    }
}

fn is_zero(n: &serde_json::Number) -> bool {
    n.as_f64() == Some(0.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationId(String);

impl NotificationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A push frame decoded into its display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub id: Option<NotificationId>,
    pub title: String,
    pub body: String,
    pub raw: String,
}

impl NotificationEvent {
    /// Decodes a push frame. A missing title becomes `default_title`; a missing
    /// body becomes the raw payload text.
    ///
    /// # Errors
    /// Returns `DecodeError` if the payload is not a JSON object.
    pub fn decode(raw: &str, default_title: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(object) = value else {
            return Err(DecodeError::NotAnObject);
        };

        Ok(Self {
            id: ID_FIELDS.first_text(&object).map(NotificationId),
            title: TITLE_FIELDS.first_text(&object).unwrap_or_else(|| default_title.to_string()),
            body: BODY_FIELDS.first_text(&object).unwrap_or_else(|| raw.to_string()),
            raw: raw.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticePriority {
    Normal,
    Low,
}

/// What the presentation surface shows. Notices never expire; a notice with
/// an existing key replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub key: String,
    pub title: Option<String>,
    pub body: String,
    pub priority: NoticePriority,
}

impl Notice {
    #[must_use]
    pub fn from_event(event: &NotificationEvent) -> Self {
        let key = event.id.as_ref().map_or_else(|| format!("noti-{}", Uuid::now_v7()), |id| format!("noti-{id}"));
        Self { key, title: Some(event.title.clone()), body: event.body.clone(), priority: NoticePriority::Normal }
    }

    /// Fallback for payloads that could not be decoded: the raw text, shown
    /// at low priority.
    #[must_use]
    pub fn raw(payload: &str) -> Self {
        Self {
            key: format!("raw-{}", Uuid::now_v7()),
            title: None,
            body: payload.to_string(),
            priority: NoticePriority::Low,
        }
    }
}

/// Payload-less broadcast telling other views their data may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSignal;

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_TITLE: &str = "New notification";

    #[test]
    fn test_decode_primary_fields() {
        let raw = r#"{"ID":7,"notification_title":"Review done","notification_message":"Approved"}"#;
        let event = NotificationEvent::decode(raw, DEFAULT_TITLE).unwrap();

        assert_eq!(event.id, Some(NotificationId::new("7")));
        assert_eq!(event.title, "Review done");
        assert_eq!(event.body, "Approved");
        assert_eq!(event.raw, raw);
    }

    #[test]
    fn test_decode_every_supported_casing() {
        for title_field in TITLE_FIELDS.0 {
            for body_field in BODY_FIELDS.0 {
                let mut object = Map::new();
                object.insert((*title_field).to_string(), Value::from("T"));
                object.insert((*body_field).to_string(), Value::from("B"));
                let raw = Value::Object(object).to_string();
                let event = NotificationEvent::decode(&raw, DEFAULT_TITLE).unwrap();
                assert_eq!(event.title, "T", "title field {title_field}");
                assert_eq!(event.body, "B", "body field {body_field}");
            }
        }
    }

    #[test]
    fn test_decode_prefers_earlier_candidates() {
        let raw = r#"{"Notification_Title":"third","title":"second","notification_title":"first","id":1,"ID":2}"#;
        let event = NotificationEvent::decode(raw, DEFAULT_TITLE).unwrap();

        assert_eq!(event.title, "first");
        assert_eq!(event.id, Some(NotificationId::new("2")));
    }

    #[test]
    fn test_decode_falls_back_to_defaults() {
        let raw = r#"{"subject":"ignored","text":"ignored"}"#;
        let event = NotificationEvent::decode(raw, DEFAULT_TITLE).unwrap();

        assert_eq!(event.id, None);
        assert_eq!(event.title, DEFAULT_TITLE);
        assert_eq!(event.body, raw);
    }

    #[test]
    fn test_empty_and_zero_values_are_absent() {
        let raw = r#"{"ID":0,"id":"","notification_title":"","title":"Fallback"}"#;
        let event = NotificationEvent::decode(raw, DEFAULT_TITLE).unwrap();

        assert_eq!(event.id, None);
        assert_eq!(event.title, "Fallback");
    }

    #[test]
    fn test_string_ids_are_kept_verbatim() {
        let event = NotificationEvent::decode(r#"{"id":"abc-1"}"#, DEFAULT_TITLE).unwrap();
        assert_eq!(event.id, Some(NotificationId::new("abc-1")));
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(matches!(NotificationEvent::decode("plain text", DEFAULT_TITLE), Err(DecodeError::Json(_))));
        assert!(matches!(NotificationEvent::decode("[1,2]", DEFAULT_TITLE), Err(DecodeError::NotAnObject)));
        assert!(matches!(NotificationEvent::decode("null", DEFAULT_TITLE), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_notice_keys() {
        let with_id = NotificationEvent::decode(r#"{"id":7}"#, DEFAULT_TITLE).unwrap();
        assert_eq!(Notice::from_event(&with_id).key, "noti-7");

        let without_id = NotificationEvent::decode(r#"{"title":"x"}"#, DEFAULT_TITLE).unwrap();
        let first = Notice::from_event(&without_id);
        let second = Notice::from_event(&without_id);
        assert_ne!(first.key, second.key, "id-less deliveries must not collapse");

        let raw = Notice::raw("oops");
        assert_eq!(raw.priority, NoticePriority::Low);
        assert_eq!(raw.title, None);
        assert_eq!(raw.body, "oops");
    }
}
