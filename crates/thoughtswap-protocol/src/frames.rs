use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → Server frame. Every command is a named event plus a payload (§4.1, §6).
/// Wire: `{ "event": "JOIN_ROOM", "payload": {"joinCode": "ABC123"} }`
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    pub event: String,
    #[serde(default = "Value::default")]
    pub payload: Value,
}

impl InboundEvent {
    /// Deserialize `payload` into a concrete command struct. A malformed
    /// payload is a protocol error, not a domain PRECONDITION error — callers
    /// reject it the same way a parse failure on the outer frame is rejected.
    pub fn parse_payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Server → Client frame — a notification pushed asynchronously to one or
/// more connections (§4.1). No envelope beyond event name + payload: delivery
/// is at-most-once, in-order per connection, with no ack at this layer.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEvent {
    pub event: String,
    pub payload: Value,
}

impl OutboundEvent {
    pub fn new(event: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            event: event.into(),
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The uniform shape of every `ERROR` event payload (§6, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_event_parses_named_payload() {
        let json = r#"{"event":"JOIN_ROOM","payload":{"joinCode":"abc123"}}"#;
        let frame: InboundEvent = serde_json::from_str(json).unwrap();
        assert_eq!(frame.event, "JOIN_ROOM");
        assert_eq!(frame.payload["joinCode"], "abc123");
    }

    #[test]
    fn inbound_event_defaults_missing_payload_to_null() {
        let json = r#"{"event":"TEACHER_START_CLASS"}"#;
        let frame: InboundEvent = serde_json::from_str(json).unwrap();
        assert!(frame.payload.is_null());
    }

    #[test]
    fn outbound_event_serializes_event_and_payload() {
        let ev = OutboundEvent::new("ERROR", ErrorPayload::new("Invalid Room Code"));
        let json = ev.to_json();
        assert!(json.contains(r#""event":"ERROR""#));
        assert!(json.contains("Invalid Room Code"));
    }
}
