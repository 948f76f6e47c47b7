//! OpenAI Realtime API WebSocket message types.
//!
//! JSON events exchanged over the realtime WebSocket, restricted to what the
//! call bridge actually sends and receives.
//!
//! Client events (sent to server):
//! - session.update - Configure codec, VAD, instructions, and tools
//! - input_audio_buffer.append - Append one frame of caller audio
//! - conversation.item.create - Submit a function call result
//! - response.create - Ask the model to continue after a function result
//!
//! Server events (received from server):
//! - session.created / session.updated
//! - response.audio.delta - Audio chunk for the caller
//! - response.output_item.added - Carries the function name for a call_id
//! - response.function_call_arguments.done - Completed function call
//! - conversation.item.input_audio_transcription.completed - Caller transcript
//! - response.audio_transcript.done - Assistant transcript
//! - error
//!
//! Remaining server events are decoded and discarded so routine traffic does
//! not show up as parse warnings.

use serde::{Deserialize, Serialize};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent in `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Tool definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
    },
    /// No turn detection
    #[serde(rename = "none")]
    None {},
}

/// Tool definition in the session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters JSON schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item; the bridge only ever creates `function_call_output`
/// items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    /// Call ID for a function call output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Function output for a function call result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ConversationItem {
    /// Build a function call output item.
    pub fn function_call_output(call_id: &str, output: &str) -> Self {
        Self {
            item_type: "function_call_output".to_string(),
            call_id: Some(call_id.to_string()),
            output: Some(output.to_string()),
        }
    }
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Ask the model to generate a response
    #[serde(rename = "response.create")]
    ResponseCreate {},
}

impl ClientEvent {
    /// Audio append event; the telephony payload is already base64 in the
    /// session codec, so it is forwarded verbatim.
    pub fn audio_append(payload: &str) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: payload.to_string(),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Error payload within a server `error` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Session information in `session.created` / `session.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Provider-assigned session ID
    pub id: String,
}

/// Output item in `response.output_item.added`.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    /// Item type (e.g., "function_call", "message")
    #[serde(rename = "type", default)]
    pub item_type: String,
    /// Call ID when the item is a function call
    #[serde(default)]
    pub call_id: Option<String>,
    /// Function name when the item is a function call
    #[serde(default)]
    pub name: Option<String>,
}

/// Server events received from the OpenAI Realtime API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: Session,
    },

    /// Session configuration updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session information
        session: Session,
    },

    /// Audio data chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded audio in the session codec
        delta: String,
    },

    /// Output item added; captures the function name for a call_id before
    /// the arguments finish streaming
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        /// The added item
        item: OutputItem,
    },

    /// Function call arguments complete
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        /// Call ID to echo back in the result
        call_id: String,
        /// JSON-encoded arguments
        arguments: String,
    },

    /// Caller audio transcription complete
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// The transcript text
        #[serde(default)]
        transcript: String,
    },

    /// Assistant transcript complete
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// The transcript text
        #[serde(default)]
        transcript: String,
    },

    // Routine events the bridge acknowledges but does not act on. Listing
    // them keeps the stream free of parse warnings.
    /// Speech detection started
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {},
    /// Speech detection stopped
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {},
    /// Audio buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {},
    /// Conversation item created
    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated {},
    /// Response generation started
    #[serde(rename = "response.created")]
    ResponseCreated {},
    /// Output item complete
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {},
    /// Content part added
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {},
    /// Content part complete
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {},
    /// Audio generation complete
    #[serde(rename = "response.audio.done")]
    AudioDone {},
    /// Assistant transcript chunk
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {},
    /// Function call arguments chunk
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {},
    /// Response complete
    #[serde(rename = "response.done")]
    ResponseDone {},
    /// Rate limit headroom update
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated {},
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_append_serialization() {
        let event = ClientEvent::audio_append("bXVsYXc=");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "input_audio_buffer.append");
        assert_eq!(json["audio"], "bXVsYXc=");
    }

    #[test]
    fn test_session_update_serialization() {
        let event = ClientEvent::SessionUpdate {
            session: SessionConfig {
                modalities: Some(vec!["text".to_string(), "audio".to_string()]),
                instructions: Some("Be helpful".to_string()),
                voice: Some("alloy".to_string()),
                input_audio_format: Some("g711_ulaw".to_string()),
                output_audio_format: Some("g711_ulaw".to_string()),
                input_audio_transcription: Some(InputAudioTranscription {
                    model: "whisper-1".to_string(),
                }),
                turn_detection: Some(TurnDetection::ServerVad {
                    threshold: Some(0.5),
                    prefix_padding_ms: Some(300),
                    silence_duration_ms: Some(500),
                }),
                tools: Some(vec![ToolDef {
                    tool_type: "function".to_string(),
                    name: "schedule_estimate".to_string(),
                    description: None,
                    parameters: None,
                }]),
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session.update");
        assert_eq!(json["session"]["input_audio_format"], "g711_ulaw");
        assert_eq!(json["session"]["turn_detection"]["type"], "server_vad");
        assert_eq!(json["session"]["tools"][0]["name"], "schedule_estimate");
        // Unset optional fields must not appear on the wire
        assert!(json["session"].get("temperature").is_none());
    }

    #[test]
    fn test_function_call_output_serialization() {
        let event = ClientEvent::ConversationItemCreate {
            item: ConversationItem::function_call_output("call_123", r#"{"success":true}"#),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "conversation.item.create");
        assert_eq!(json["item"]["type"], "function_call_output");
        assert_eq!(json["item"]["call_id"], "call_123");
    }

    #[test]
    fn test_audio_delta_deserialization() {
        let raw = r#"{
            "type": "response.audio.delta",
            "event_id": "evt_1",
            "response_id": "resp_1",
            "item_id": "item_1",
            "output_index": 0,
            "content_index": 0,
            "delta": "AAAA"
        }"#;
        match serde_json::from_str::<ServerEvent>(raw).unwrap() {
            ServerEvent::AudioDelta { delta } => assert_eq!(delta, "AAAA"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_function_call_done_deserialization() {
        let raw = r#"{
            "type": "response.function_call_arguments.done",
            "event_id": "evt_2",
            "response_id": "resp_1",
            "item_id": "item_2",
            "output_index": 1,
            "call_id": "call_9",
            "arguments": "{\"phone\":\"+15551234567\"}"
        }"#;
        match serde_json::from_str::<ServerEvent>(raw).unwrap() {
            ServerEvent::FunctionCallArgumentsDone { call_id, arguments } => {
                assert_eq!(call_id, "call_9");
                assert!(arguments.contains("phone"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_output_item_added_carries_function_name() {
        let raw = r#"{
            "type": "response.output_item.added",
            "response_id": "resp_1",
            "output_index": 0,
            "item": {
                "id": "item_2",
                "type": "function_call",
                "call_id": "call_9",
                "name": "schedule_estimate",
                "arguments": ""
            }
        }"#;
        match serde_json::from_str::<ServerEvent>(raw).unwrap() {
            ServerEvent::OutputItemAdded { item } => {
                assert_eq!(item.item_type, "function_call");
                assert_eq!(item.call_id.as_deref(), Some("call_9"));
                assert_eq!(item.name.as_deref(), Some("schedule_estimate"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_routine_events_deserialize_quietly() {
        for raw in [
            r#"{"type":"response.created","response":{"id":"r1"}}"#,
            r#"{"type":"response.audio_transcript.delta","delta":"hel"}"#,
            r#"{"type":"rate_limits.updated","rate_limits":[]}"#,
            r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":100,"item_id":"i1"}"#,
        ] {
            assert!(serde_json::from_str::<ServerEvent>(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_error_event_deserialization() {
        let raw = r#"{
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "bad session"}
        }"#;
        match serde_json::from_str::<ServerEvent>(raw).unwrap() {
            ServerEvent::Error { error } => {
                assert_eq!(error.error_type, "invalid_request_error");
                assert_eq!(error.message, "bad session");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
