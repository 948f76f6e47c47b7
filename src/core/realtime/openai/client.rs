//! OpenAI Realtime API connector.
//!
//! Implements [`AiConnector`] / [`AiTransport`] over the OpenAI Realtime
//! WebSocket. One spawned pump task per call owns both halves of the socket:
//! it drains a command channel toward OpenAI and translates incoming server
//! events into typed [`AiEvent`]s on the event channel. There is no
//! reconnection; when the socket drops mid-call the pump emits a terminal
//! event and the bridge tears the call down.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Audio: base64-encoded G.711 u-law in both directions for telephony calls

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use super::config::{
    INPUT_TRANSCRIPTION_MODEL, OPENAI_REALTIME_URL, OpenAiRealtimeAudioFormat, OpenAiRealtimeModel,
    OpenAiRealtimeVoice,
};
use super::messages::{
    ClientEvent, ConversationItem, InputAudioTranscription, ServerEvent, SessionConfig, ToolDef,
    TurnDetection,
};
use crate::core::realtime::base::{
    AiConnector, AiEvent, AiEventReceiver, AiTransport, FunctionCallRequest, RealtimeConfig,
    RealtimeError, RealtimeResult, TranscriptResult, TranscriptRole,
};

/// Channel capacity for outgoing client events.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for decoded server events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Connector
// =============================================================================

/// Opens realtime sessions against the OpenAI API.
#[derive(Debug, Clone, Default)]
pub struct OpenAiConnector;

impl OpenAiConnector {
    /// Create a new connector.
    pub fn new() -> Self {
        Self
    }

    /// Build the WebSocket URL with the model parameter.
    fn build_ws_url(model: OpenAiRealtimeModel) -> String {
        format!("{}?model={}", OPENAI_REALTIME_URL, model.as_str())
    }

    /// Build the initial `session.update` payload from the call configuration.
    fn build_session_config(config: &RealtimeConfig) -> SessionConfig {
        let voice = config
            .voice
            .as_deref()
            .map(OpenAiRealtimeVoice::from_str_or_default)
            .unwrap_or_default();
        let input_format = config
            .input_audio_format
            .as_deref()
            .map(OpenAiRealtimeAudioFormat::from_str_or_default)
            .unwrap_or_default();
        let output_format = config
            .output_audio_format
            .as_deref()
            .map(OpenAiRealtimeAudioFormat::from_str_or_default)
            .unwrap_or_default();

        SessionConfig {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: config.instructions.clone(),
            voice: Some(voice.as_str().to_string()),
            input_audio_format: Some(input_format.as_str().to_string()),
            output_audio_format: Some(output_format.as_str().to_string()),
            input_audio_transcription: Some(InputAudioTranscription {
                model: config
                    .transcription_model
                    .clone()
                    .unwrap_or_else(|| INPUT_TRANSCRIPTION_MODEL.to_string()),
            }),
            turn_detection: config.turn_detection.as_ref().map(|td| {
                TurnDetection::ServerVad {
                    threshold: Some(td.threshold),
                    prefix_padding_ms: Some(td.prefix_padding_ms),
                    silence_duration_ms: Some(td.silence_duration_ms),
                }
            }),
            tools: if config.tools.is_empty() {
                None
            } else {
                Some(
                    config
                        .tools
                        .iter()
                        .map(|t| ToolDef {
                            tool_type: "function".to_string(),
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.parameters.clone(),
                        })
                        .collect(),
                )
            },
        }
    }
}

#[async_trait]
impl AiConnector for OpenAiConnector {
    async fn connect(
        &self,
        config: RealtimeConfig,
    ) -> RealtimeResult<(Box<dyn AiTransport>, AiEventReceiver)> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = OpenAiRealtimeModel::from_str_or_default(&config.model);
        let url = Self::build_ws_url(model);

        let request = http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header("Sec-WebSocket-Protocol", "realtime")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", "api.openai.com")
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        tracing::info!(model = model.as_str(), "Connected to OpenAI Realtime API");

        let (mut ws_sink, ws_stream) = ws_stream.split();

        // The session configuration is the first frame on the wire; audio
        // must not be appended before the codec is set.
        let session_update = ClientEvent::SessionUpdate {
            session: Self::build_session_config(&config),
        };
        let json = serde_json::to_string(&session_update)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
        ws_sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel::<ClientEvent>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<AiEvent>(EVENT_CHANNEL_CAPACITY);

        let open = Arc::new(AtomicBool::new(true));
        tokio::spawn(pump(
            ws_sink,
            ws_stream,
            command_rx,
            event_tx,
            open.clone(),
        ));

        let transport = OpenAiTransport {
            commands: Some(command_tx),
            open,
        };
        Ok((Box::new(transport), event_rx))
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Command handle for one OpenAI realtime session.
pub struct OpenAiTransport {
    /// Dropped on close, which ends the pump task
    commands: Option<mpsc::Sender<ClientEvent>>,
    /// Cleared by the pump when the socket drops
    open: Arc<AtomicBool>,
}

impl OpenAiTransport {
    async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        let commands = self.commands.as_ref().ok_or(RealtimeError::NotConnected)?;
        commands
            .send(event)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }
}

#[async_trait]
impl AiTransport for OpenAiTransport {
    async fn send_audio(&self, payload: &str) -> RealtimeResult<()> {
        self.send(ClientEvent::audio_append(payload)).await
    }

    async fn submit_function_result(&self, call_id: &str, output: &str) -> RealtimeResult<()> {
        self.send(ClientEvent::ConversationItemCreate {
            item: ConversationItem::function_call_output(call_id, output),
        })
        .await?;
        // Nudge the model to speak the confirmation.
        self.send(ClientEvent::ResponseCreate {}).await
    }

    async fn close(&mut self) {
        // Dropping the command sender closes the channel; the pump sends the
        // WebSocket close frame and exits. Subsequent calls are no-ops.
        if self.commands.take().is_some() {
            tracing::debug!("Closing OpenAI realtime transport");
        }
    }

    fn is_open(&self) -> bool {
        self.commands.is_some() && self.open.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Pump task
// =============================================================================

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsStream = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

/// Own the socket for the lifetime of the session: forward queued client
/// events and translate server events into [`AiEvent`]s.
async fn pump(
    mut ws_sink: WsSink,
    mut ws_stream: WsStream,
    mut command_rx: mpsc::Receiver<ClientEvent>,
    event_tx: mpsc::Sender<AiEvent>,
    open: Arc<AtomicBool>,
) {
    // call_id -> function name; OutputItemAdded carries the name,
    // FunctionCallArgumentsDone does not.
    let mut pending_function_calls: HashMap<String, String> = HashMap::new();

    loop {
        tokio::select! {
            command = command_rx.recv() => {
                match command {
                    Some(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client event: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            let _ = event_tx
                                .send(AiEvent::Error(RealtimeError::WebSocketError(e.to_string())))
                                .await;
                            break;
                        }
                    }
                    None => {
                        // Transport was closed on our side.
                        let _ = ws_sink.send(Message::Close(None)).await;
                        let _ = event_tx.send(AiEvent::Closed).await;
                        break;
                    }
                }
            }

            message = ws_stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => {
                                dispatch_server_event(
                                    event,
                                    &event_tx,
                                    &mut pending_function_calls,
                                )
                                .await;
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse server event: {} - {}", e, text);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            tracing::error!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("OpenAI realtime connection closed by server");
                        let _ = event_tx.send(AiEvent::Closed).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("OpenAI realtime WebSocket error: {}", e);
                        let _ = event_tx
                            .send(AiEvent::Error(RealtimeError::WebSocketError(e.to_string())))
                            .await;
                        break;
                    }
                }
            }
        }
    }

    open.store(false, Ordering::SeqCst);
}

/// Translate one server event onto the typed event channel.
async fn dispatch_server_event(
    event: ServerEvent,
    event_tx: &mpsc::Sender<AiEvent>,
    pending_function_calls: &mut HashMap<String, String>,
) {
    match event {
        ServerEvent::SessionCreated { session } => {
            tracing::info!("OpenAI realtime session created: {}", session.id);
            let _ = event_tx
                .send(AiEvent::SessionReady {
                    session_id: session.id,
                })
                .await;
        }

        ServerEvent::SessionUpdated { session } => {
            tracing::debug!("OpenAI realtime session updated: {}", session.id);
        }

        ServerEvent::Error { error } => {
            tracing::error!(
                "OpenAI realtime error: {} - {}",
                error.error_type,
                error.message
            );
            let _ = event_tx
                .send(AiEvent::Error(RealtimeError::ProviderError(format!(
                    "{}: {}",
                    error.error_type, error.message
                ))))
                .await;
        }

        ServerEvent::AudioDelta { delta } => {
            // The payload is base64 in the session codec either way, so it is
            // forwarded without decoding.
            let _ = event_tx.send(AiEvent::AudioDelta { payload: delta }).await;
        }

        ServerEvent::OutputItemAdded { item } => {
            if item.item_type == "function_call"
                && let (Some(call_id), Some(name)) = (item.call_id, item.name)
            {
                tracing::debug!("Tracking function call: call_id={}, name={}", call_id, name);
                pending_function_calls.insert(call_id, name);
            }
        }

        ServerEvent::FunctionCallArgumentsDone { call_id, arguments } => {
            let name = pending_function_calls
                .remove(&call_id)
                .unwrap_or_else(|| {
                    tracing::warn!("Function name not found for call_id: {}", call_id);
                    String::new()
                });
            let _ = event_tx
                .send(AiEvent::FunctionCall(FunctionCallRequest {
                    call_id,
                    name,
                    arguments,
                }))
                .await;
        }

        ServerEvent::TranscriptionCompleted { transcript } => {
            let _ = event_tx
                .send(AiEvent::Transcript(TranscriptResult {
                    text: transcript,
                    role: TranscriptRole::User,
                }))
                .await;
        }

        ServerEvent::AudioTranscriptDone { transcript } => {
            let _ = event_tx
                .send(AiEvent::Transcript(TranscriptResult {
                    text: transcript,
                    role: TranscriptRole::Assistant,
                }))
                .await;
        }

        _ => {
            tracing::trace!("Unhandled server event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::base::{ToolDefinition, TurnDetectionConfig};

    #[test]
    fn test_build_ws_url() {
        let url = OpenAiConnector::build_ws_url(OpenAiRealtimeModel::default());
        assert_eq!(
            url,
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-10-01"
        );
    }

    #[test]
    fn test_build_session_config_defaults_to_telephony_codec() {
        let config = RealtimeConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
            instructions: Some("Be Sarah".to_string()),
            input_audio_format: Some("g711_ulaw".to_string()),
            output_audio_format: Some("g711_ulaw".to_string()),
            turn_detection: Some(TurnDetectionConfig::default()),
            tools: vec![ToolDefinition {
                name: "schedule_estimate".to_string(),
                description: Some("Schedule an estimate".to_string()),
                parameters: Some(serde_json::json!({"type": "object"})),
            }],
            ..Default::default()
        };

        let session = OpenAiConnector::build_session_config(&config);
        assert_eq!(session.input_audio_format.as_deref(), Some("g711_ulaw"));
        assert_eq!(session.output_audio_format.as_deref(), Some("g711_ulaw"));
        assert_eq!(session.voice.as_deref(), Some("alloy"));
        assert_eq!(
            session.input_audio_transcription.as_ref().unwrap().model,
            "whisper-1"
        );
        let tools = session.tools.as_ref().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "schedule_estimate");
        assert!(matches!(
            session.turn_detection,
            Some(TurnDetection::ServerVad {
                threshold: Some(t), ..
            }) if (t - 0.5).abs() < f32::EPSILON
        ));
    }

    #[test]
    fn test_build_session_config_omits_empty_tools() {
        let config = RealtimeConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        };
        let session = OpenAiConnector::build_session_config(&config);
        assert!(session.tools.is_none());
        assert!(session.turn_detection.is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_missing_api_key() {
        let connector = OpenAiConnector::new();
        let result = connector.connect(RealtimeConfig::default()).await;
        assert!(matches!(
            result,
            Err(RealtimeError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_sends() {
        let (tx, rx) = mpsc::channel::<ClientEvent>(4);
        drop(rx);
        let transport = OpenAiTransport {
            commands: Some(tx),
            open: Arc::new(AtomicBool::new(true)),
        };
        assert!(matches!(
            transport.send_audio("AAAA").await,
            Err(RealtimeError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (tx, _rx) = mpsc::channel::<ClientEvent>(4);
        let mut transport = OpenAiTransport {
            commands: Some(tx),
            open: Arc::new(AtomicBool::new(true)),
        };
        assert!(transport.is_open());
        transport.close().await;
        assert!(!transport.is_open());
        transport.close().await;
        assert!(!transport.is_open());
    }
}
