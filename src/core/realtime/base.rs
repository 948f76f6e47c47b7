//! Base types for the realtime audio-to-audio transport.
//!
//! The bridge talks to the AI side through two seams: [`AiConnector`], which
//! opens a session and hands back a command handle plus a stream of typed
//! [`AiEvent`]s, and [`AiTransport`], the per-call command handle. Events are
//! delivered over an `mpsc` channel so the call bridge can drive everything
//! from a single dispatch loop instead of nested callbacks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Provider-reported error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Session configuration handed to the connector at call start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// Model to use (e.g., "gpt-4o-realtime-preview-2024-10-01")
    #[serde(default)]
    pub model: String,

    /// Voice ID for audio output
    #[serde(default)]
    pub voice: Option<String>,

    /// System instructions for the assistant
    #[serde(default)]
    pub instructions: Option<String>,

    /// Input audio format (e.g., "g711_ulaw")
    #[serde(default)]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(default)]
    pub output_audio_format: Option<String>,

    /// Model used for input audio transcription, when enabled
    #[serde(default)]
    pub transcription_model: Option<String>,

    /// Turn detection configuration
    #[serde(default)]
    pub turn_detection: Option<TurnDetectionConfig>,

    /// Tool definitions for function calling
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

/// Configuration for server-side turn detection (VAD).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnDetectionConfig {
    /// Activation threshold (0.0 to 1.0)
    pub threshold: f32,
    /// Amount of audio to include before voice detection (ms)
    pub prefix_padding_ms: u32,
    /// Silence duration before end of turn (ms)
    pub silence_duration_ms: u32,
}

impl Default for TurnDetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Tool definition for function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,
    /// Function description
    pub description: Option<String>,
    /// JSON schema for parameters
    pub parameters: Option<serde_json::Value>,
}

/// Function call request emitted by the model mid-conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallRequest {
    /// Call ID to echo back in the result
    pub call_id: String,
    /// Function name
    pub name: String,
    /// Raw JSON arguments
    pub arguments: String,
}

/// Role of the speaker in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    /// Caller speech transcript
    User,
    /// Assistant speech transcript
    Assistant,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptRole::User => write!(f, "user"),
            TranscriptRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Final transcript of one side of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// The transcribed text
    pub text: String,
    /// Who was speaking
    pub role: TranscriptRole,
}

/// Typed events decoded from the AI transport.
#[derive(Debug)]
pub enum AiEvent {
    /// The provider session is created and configured
    SessionReady {
        /// Provider-assigned session ID
        session_id: String,
    },
    /// One chunk of output audio, already base64-encoded in the call codec
    AudioDelta {
        /// Base64 payload, forwarded verbatim to the telephony transport
        payload: String,
    },
    /// The model finished emitting a function call
    FunctionCall(FunctionCallRequest),
    /// A completed transcript (observability only)
    Transcript(TranscriptResult),
    /// The provider reported an error or the connection dropped
    Error(RealtimeError),
    /// The provider closed the connection normally
    Closed,
}

/// Receiver half of the AI event stream.
pub type AiEventReceiver = mpsc::Receiver<AiEvent>;

/// Per-call command handle into the AI transport.
///
/// Owned exclusively by one call's bridge; `close` is idempotent.
#[async_trait]
pub trait AiTransport: Send {
    /// Append one frame of caller audio (base64 payload in the call codec).
    async fn send_audio(&self, payload: &str) -> RealtimeResult<()>;

    /// Submit a function call result back into the conversation.
    async fn submit_function_result(&self, call_id: &str, output: &str) -> RealtimeResult<()>;

    /// Close the transport. Safe to call more than once; only the first
    /// call has any effect.
    async fn close(&mut self);

    /// Whether the transport is still open.
    fn is_open(&self) -> bool;
}

/// Opens AI sessions. One implementation per provider; test doubles plug in
/// here.
#[async_trait]
pub trait AiConnector: Send + Sync {
    /// Open a session, send the initial configuration, and return the
    /// command handle plus the decoded event stream.
    async fn connect(
        &self,
        config: RealtimeConfig,
    ) -> RealtimeResult<(Box<dyn AiTransport>, AiEventReceiver)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_role_display() {
        assert_eq!(TranscriptRole::User.to_string(), "user");
        assert_eq!(TranscriptRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_default_turn_detection() {
        let td = TurnDetectionConfig::default();
        assert_eq!(td.threshold, 0.5);
        assert_eq!(td.prefix_padding_ms, 300);
        assert_eq!(td.silence_duration_ms, 500);
    }

    #[test]
    fn test_error_display() {
        let err = RealtimeError::ConnectionFailed("test".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = RealtimeError::NotConnected;
        assert_eq!(err.to_string(), "Not connected");
    }

    #[test]
    fn test_default_config_is_empty() {
        let config = RealtimeConfig::default();
        assert!(config.api_key.is_empty());
        assert!(config.tools.is_empty());
        assert!(config.turn_detection.is_none());
    }
}
