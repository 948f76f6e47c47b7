//! OpenAI Realtime API provider.

mod client;
mod config;
mod messages;

pub use client::{OpenAiConnector, OpenAiTransport};
pub use config::{
    INPUT_TRANSCRIPTION_MODEL, OPENAI_REALTIME_URL, OpenAiRealtimeAudioFormat, OpenAiRealtimeModel,
    OpenAiRealtimeVoice,
};
pub use messages::{ClientEvent, ServerEvent, SessionConfig};
