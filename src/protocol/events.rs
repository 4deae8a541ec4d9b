//! Inbound (server) realtime events.

use serde_json::Value;

/// An item announced by `response.output_item.added`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputItem {
    pub item_type: String,
    pub call_id: Option<String>,
    pub name: Option<String>,
}

impl OutputItem {
    /// Whether this item opens a streamed function call.
    pub fn is_function_call(&self) -> bool {
        self.item_type == "function_call"
    }
}

/// Events received from the realtime server, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    SessionCreated { session_id: String },
    SessionUpdated { session_id: Option<String> },
    ResponseCreated { response_id: Option<String> },
    OutputItemAdded { item: OutputItem },
    FunctionCallArgumentsDelta { call_id: Option<String>, delta: String },
    FunctionCallArgumentsDone { call_id: Option<String> },
    TextDelta { delta: String },
    AudioDelta { delta: String },
    ResponseDone { response_id: Option<String> },
    RateLimitsUpdated,
    Error { message: String, code: Option<String> },
    SpeechStarted,
    SpeechStopped,
    ConversationItemCreated { item_id: Option<String> },
    ConversationItemDeleted { item_id: Option<String> },
    ConversationItemTruncated { item_id: Option<String> },
    Unknown { event_type: String },
}

impl ServerEvent {
    /// Parse a server event payload into a typed event.
    ///
    /// Returns `None` only when the payload carries no string `type`; every
    /// typed payload maps to some variant, unrecognized ones to `Unknown`.
    pub fn from_server_payload(payload: &Value) -> Option<Self> {
        let event_type = payload.get("type")?.as_str()?;
        let event = match event_type {
            "session.created" => Self::SessionCreated {
                session_id: string_at(payload, &["session", "id"])
                    .or_else(|| string_field(payload, "session_id"))
                    .unwrap_or_else(|| "unknown".to_string()),
            },
            "session.updated" => Self::SessionUpdated {
                session_id: string_at(payload, &["session", "id"])
                    .or_else(|| string_field(payload, "session_id")),
            },
            "response.created" => Self::ResponseCreated {
                response_id: string_at(payload, &["response", "id"]),
            },
            "response.output_item.added" => Self::OutputItemAdded {
                item: OutputItem {
                    item_type: string_at(payload, &["item", "type"]).unwrap_or_default(),
                    call_id: string_at(payload, &["item", "call_id"]),
                    name: string_at(payload, &["item", "name"]),
                },
            },
            "response.function_call_arguments.delta" => Self::FunctionCallArgumentsDelta {
                call_id: string_field(payload, "call_id"),
                delta: string_field(payload, "delta").unwrap_or_default(),
            },
            "response.function_call_arguments.done" => Self::FunctionCallArgumentsDone {
                call_id: string_field(payload, "call_id"),
            },
            "response.text.delta" => Self::TextDelta {
                delta: string_field(payload, "delta").unwrap_or_default(),
            },
            "response.audio.delta" => Self::AudioDelta {
                delta: string_field(payload, "delta").unwrap_or_default(),
            },
            "response.done" => Self::ResponseDone {
                response_id: string_at(payload, &["response", "id"]),
            },
            "rate_limits.updated" => Self::RateLimitsUpdated,
            "error" => Self::Error {
                message: string_at(payload, &["error", "message"])
                    .or_else(|| string_field(payload, "message"))
                    .unwrap_or_default(),
                code: string_at(payload, &["error", "code"]),
            },
            "input_audio_buffer.speech_started" => Self::SpeechStarted,
            "input_audio_buffer.speech_stopped" => Self::SpeechStopped,
            "conversation.item.created" => Self::ConversationItemCreated {
                item_id: string_at(payload, &["item", "id"]),
            },
            "conversation.item.deleted" => Self::ConversationItemDeleted {
                item_id: string_field(payload, "item_id"),
            },
            "conversation.item.truncated" => Self::ConversationItemTruncated {
                item_id: string_field(payload, "item_id"),
            },
            _ => Self::Unknown {
                event_type: event_type.to_string(),
            },
        };
        Some(event)
    }

    /// The wire `type` string of this event.
    pub fn event_type(&self) -> &str {
        match self {
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated { .. } => "session.updated",
            Self::ResponseCreated { .. } => "response.created",
            Self::OutputItemAdded { .. } => "response.output_item.added",
            Self::FunctionCallArgumentsDelta { .. } => "response.function_call_arguments.delta",
            Self::FunctionCallArgumentsDone { .. } => "response.function_call_arguments.done",
            Self::TextDelta { .. } => "response.text.delta",
            Self::AudioDelta { .. } => "response.audio.delta",
            Self::ResponseDone { .. } => "response.done",
            Self::RateLimitsUpdated => "rate_limits.updated",
            Self::Error { .. } => "error",
            Self::SpeechStarted => "input_audio_buffer.speech_started",
            Self::SpeechStopped => "input_audio_buffer.speech_stopped",
            Self::ConversationItemCreated { .. } => "conversation.item.created",
            Self::ConversationItemDeleted { .. } => "conversation.item.deleted",
            Self::ConversationItemTruncated { .. } => "conversation.item.truncated",
            Self::Unknown { event_type } => event_type,
        }
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str().map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_function_call_item() {
        let event = ServerEvent::from_server_payload(&json!({
            "type": "response.output_item.added",
            "item": {"type": "function_call", "name": "Echo", "call_id": "1"}
        }))
        .unwrap();
        let ServerEvent::OutputItemAdded { item } = event else {
            panic!("unexpected event: {event:?}");
        };
        assert!(item.is_function_call());
        assert_eq!(item.name.as_deref(), Some("Echo"));
        assert_eq!(item.call_id.as_deref(), Some("1"));
    }

    #[test]
    fn message_items_are_not_function_calls() {
        let event = ServerEvent::from_server_payload(&json!({
            "type": "response.output_item.added",
            "item": {"type": "message", "id": "item_1"}
        }))
        .unwrap();
        assert!(matches!(
            event,
            ServerEvent::OutputItemAdded { ref item } if !item.is_function_call()
        ));
    }

    #[test]
    fn parses_error_message_and_code() {
        let event = ServerEvent::from_server_payload(&json!({
            "type": "error",
            "error": {
                "message": "Conversation already has an active response",
                "code": "conversation_already_has_active_response"
            }
        }))
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::Error {
                message: "Conversation already has an active response".into(),
                code: Some("conversation_already_has_active_response".into()),
            }
        );
    }

    #[test]
    fn missing_delta_becomes_empty_fragment() {
        let event = ServerEvent::from_server_payload(&json!({
            "type": "response.function_call_arguments.delta",
            "call_id": "abc"
        }))
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::FunctionCallArgumentsDelta {
                call_id: Some("abc".into()),
                delta: String::new(),
            }
        );
    }

    #[test]
    fn unknown_types_are_preserved() {
        let event = ServerEvent::from_server_payload(&json!({"type": "response.audio_transcript.delta"}))
            .unwrap();
        assert_eq!(event.event_type(), "response.audio_transcript.delta");
        assert!(matches!(event, ServerEvent::Unknown { .. }));
    }

    #[test]
    fn untyped_payload_is_rejected() {
        assert!(ServerEvent::from_server_payload(&json!({"delta": "x"})).is_none());
        assert!(ServerEvent::from_server_payload(&json!({"type": 7})).is_none());
    }

    #[test]
    fn event_type_round_trips_wire_names() {
        for wire in [
            "response.created",
            "response.done",
            "rate_limits.updated",
            "input_audio_buffer.speech_started",
            "input_audio_buffer.speech_stopped",
            "conversation.item.truncated",
        ] {
            let event = ServerEvent::from_server_payload(&json!({"type": wire})).unwrap();
            assert_eq!(event.event_type(), wire);
        }
    }
}
