// Verify wire format matches what ThoughtSwap clients expect (§6).
// These tests ensure the event protocol is never broken silently.

use thoughtswap_core::{PromptKind, UserRole};
use thoughtswap_protocol::events;
use thoughtswap_protocol::frames::{ErrorPayload, InboundEvent, OutboundEvent};
use thoughtswap_protocol::handshake::IdentityHint;
use thoughtswap_protocol::payloads::{JoinRoomPayload, NewPromptPayload, TeacherSendPromptPayload};

#[test]
fn inbound_join_room_parses_into_typed_payload() {
    let json = r#"{"event":"JOIN_ROOM","payload":{"joinCode":"ABC123"}}"#;
    let frame: InboundEvent = serde_json::from_str(json).unwrap();
    assert_eq!(frame.event, events::JOIN_ROOM);

    let payload: JoinRoomPayload = frame.parse_payload().unwrap();
    assert_eq!(payload.join_code, "ABC123");
}

#[test]
fn inbound_teacher_send_prompt_round_trips_mc_options() {
    let json = r#"{
        "event":"TEACHER_SEND_PROMPT",
        "payload":{"joinCode":"ABC123","content":"Pick one","type":"MC","options":["A","B"]}
    }"#;
    let frame: InboundEvent = serde_json::from_str(json).unwrap();
    let payload: TeacherSendPromptPayload = frame.parse_payload().unwrap();
    assert_eq!(payload.kind, PromptKind::Mc);
    assert_eq!(payload.options.unwrap(), vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn outbound_new_prompt_serializes_camel_case() {
    let ev = OutboundEvent::new(
        events::NEW_PROMPT,
        NewPromptPayload {
            content: "What did you learn?".into(),
            prompt_use_id: "pu-1".into(),
            kind: PromptKind::Text,
            options: None,
        },
    );
    let json = ev.to_json();
    assert!(json.contains(r#""event":"NEW_PROMPT""#));
    assert!(json.contains(r#""promptUseId":"pu-1""#));
    assert!(!json.contains("options"));
}

#[test]
fn outbound_error_payload_carries_message_only() {
    let ev = OutboundEvent::new(events::ERROR, ErrorPayload::new("Invalid Room Code"));
    let json = ev.to_json();
    assert!(json.contains(r#""event":"ERROR""#));
    assert!(json.contains("Invalid Room Code"));
}

#[test]
fn identity_hint_guest_email_is_detected() {
    let hint = IdentityHint {
        email: "guest_abc123".into(),
        name: "Guest".into(),
        role: UserRole::Student,
    };
    assert!(hint.is_guest());

    let registered = IdentityHint {
        email: "teacher@school.edu".into(),
        name: "Ms. Rivera".into(),
        role: UserRole::Teacher,
    };
    assert!(!registered.is_guest());
}

#[test]
fn inbound_event_missing_payload_defaults_to_null() {
    let json = r#"{"event":"TEACHER_START_CLASS"}"#;
    let frame: InboundEvent = serde_json::from_str(json).unwrap();
    assert!(frame.payload.is_null());
}
