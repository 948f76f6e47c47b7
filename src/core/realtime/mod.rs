//! Realtime audio-to-audio transport.
//!
//! The base module defines the provider-agnostic seams ([`AiConnector`],
//! [`AiTransport`], [`AiEvent`]); the `openai` module implements them over
//! the OpenAI Realtime API.

pub mod base;
pub mod openai;

pub use base::{
    AiConnector, AiEvent, AiEventReceiver, AiTransport, FunctionCallRequest, RealtimeConfig,
    RealtimeError, RealtimeResult, ToolDefinition, TranscriptResult, TranscriptRole,
    TurnDetectionConfig,
};
pub use openai::OpenAiConnector;
