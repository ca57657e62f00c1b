use crate::domain::notification::FieldChain;
use serde_json::Value;
use std::fmt;

pub const SUBSCRIBER_ID_FIELDS: FieldChain = FieldChain(&["ID", "id"]);

/// Identity of the logged-in user scoping the push connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Returns `None` for identities that count as absent (empty or `0`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "0" {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Extracts the identity from a stored session object (`ID` or `id`).
    #[must_use]
    pub fn from_session(session: &Value) -> Option<Self> {
        let Value::Object(object) = session else {
            return None;
        };
        SUBSCRIBER_ID_FIELDS.first_text(object).and_then(|id| Self::parse(&id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_treats_zero_and_blank_as_absent() {
        assert_eq!(SubscriberId::parse("42"), Some(SubscriberId("42".to_string())));
        assert_eq!(SubscriberId::parse(" 42 "), Some(SubscriberId("42".to_string())));
        assert_eq!(SubscriberId::parse("0"), None);
        assert_eq!(SubscriberId::parse(""), None);
    }

    #[test]
    fn test_from_session_fields() {
        assert_eq!(SubscriberId::from_session(&json!({"ID": 42})).unwrap().as_str(), "42");
        assert_eq!(SubscriberId::from_session(&json!({"id": "17"})).unwrap().as_str(), "17");
        assert_eq!(SubscriberId::from_session(&json!({"ID": 0, "id": 5})).unwrap().as_str(), "5");
        assert_eq!(SubscriberId::from_session(&json!({"name": "alice"})), None);
        assert_eq!(SubscriberId::from_session(&json!("42")), None);
    }
}
