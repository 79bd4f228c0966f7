//! Clerk webhook envelope and event variants

use serde::Deserialize;
use serde_json::{Map, Value};

use super::WebhookError;

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// Raw `{type, data}` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,

    /// Only user events need an object here
    #[serde(default)]
    pub data: Option<Value>,
}

/// A decoded Clerk event
#[derive(Debug, Clone, PartialEq)]
pub enum ClerkEvent {
    UserCreated(Map<String, Value>),
    UserUpdated(Map<String, Value>),
    UserDeleted(Map<String, Value>),

    /// Any other event type, carried by tag only
    Unknown(String),
}

impl ClerkEvent {
    /// Decodes a raw webhook body
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidPayload`] if the body is not JSON,
    /// lacks `type`, or is a user event without an object `data`. Other
    /// event types decode to [`ClerkEvent::Unknown`] whatever `data` holds.
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: EventEnvelope = serde_json::from_slice(body)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        envelope.try_into()
    }

    /// The event type tag as sent by Clerk
    pub fn event_type(&self) -> &str {
        match self {
            ClerkEvent::UserCreated(_) => USER_CREATED,
            ClerkEvent::UserUpdated(_) => USER_UPDATED,
            ClerkEvent::UserDeleted(_) => USER_DELETED,
            ClerkEvent::Unknown(tag) => tag,
        }
    }
}

impl TryFrom<EventEnvelope> for ClerkEvent {
    type Error = WebhookError;

    fn try_from(envelope: EventEnvelope) -> Result<Self, Self::Error> {
        let wrap: fn(Map<String, Value>) -> ClerkEvent = match envelope.event_type.as_str() {
            USER_CREATED => ClerkEvent::UserCreated,
            USER_UPDATED => ClerkEvent::UserUpdated,
            USER_DELETED => ClerkEvent::UserDeleted,
            _ => return Ok(ClerkEvent::Unknown(envelope.event_type)),
        };

        match envelope.data {
            Some(Value::Object(data)) => Ok(wrap(data)),
            Some(_) => Err(WebhookError::InvalidPayload(format!(
                "{}: data must be an object",
                envelope.event_type
            ))),
            None => Err(WebhookError::InvalidPayload(format!(
                "{}: missing data",
                envelope.event_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_event_types() {
        let event = ClerkEvent::from_slice(br#"{"type":"user.created","data":{"id":"user_1"}}"#).unwrap();
        match event {
            ClerkEvent::UserCreated(data) => assert_eq!(data["id"], "user_1"),
            other => panic!("unexpected event: {:?}", other),
        }

        let event = ClerkEvent::from_slice(br#"{"type":"user.deleted","data":{"id":"user_1","deleted":true}}"#).unwrap();
        assert_eq!(event.event_type(), USER_DELETED);
    }

    #[test]
    fn test_unknown_event_type() {
        let event = ClerkEvent::from_slice(br#"{"type":"session.created","data":{}}"#).unwrap();
        assert_eq!(event, ClerkEvent::Unknown("session.created".to_string()));
        assert_eq!(event.event_type(), "session.created");
    }

    #[test]
    fn test_unknown_event_type_ignores_data_shape() {
        let bodies: [&[u8]; 3] = [
            br#"{"type":"session.ended","data":null}"#,
            br#"{"type":"session.ended"}"#,
            br#"{"type":"session.ended","data":[1]}"#,
        ];

        for body in bodies {
            let event = ClerkEvent::from_slice(body).unwrap();
            assert_eq!(event, ClerkEvent::Unknown("session.ended".to_string()));
        }
    }

    #[test]
    fn test_malformed_envelopes() {
        let bodies: [&[u8]; 6] = [
            b"not json",
            br#"{"data":{}}"#,
            br#"{"type":"user.created"}"#,
            br#"{"type":"user.created","data":"user_1"}"#,
            br#"{"type":"user.updated","data":null}"#,
            br#"{"type":"user.deleted","data":[1]}"#,
        ];

        for body in bodies {
            let err = ClerkEvent::from_slice(body).unwrap_err();
            assert!(matches!(err, WebhookError::InvalidPayload(_)));
        }
    }
}
