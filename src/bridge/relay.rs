//! The per-call bridge.
//!
//! One [`CallBridge`] task runs for the lifetime of each call. It owns the
//! AI leg end to end: it opens the realtime session, buffers caller audio
//! while the handshake is in flight, then drives a single dispatch loop over
//! the two event streams (telephony in, AI in). Audio stays 1:1 and ordered
//! because nothing else ever touches either stream. Function calls are
//! resolved on a side task so persistence never stalls the audio path.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::analytics::CallSummary;
use crate::config::{ServerConfig, TenantProfile};
use crate::core::realtime::base::{
    AiEvent, AiEventReceiver, AiTransport, FunctionCallRequest, RealtimeConfig, RealtimeResult,
    ToolDefinition, TurnDetectionConfig,
};
use crate::records::{self, RecordStore, ValidationError};
use crate::state::AppState;
use crate::telephony::OutboundMediaFrame;

use super::session::{CallState, Session};

/// Events forwarded from the telephony socket into the bridge.
#[derive(Debug)]
pub enum TelephonyEvent {
    /// One frame of caller audio, base64 in the call codec
    Media {
        /// Frame payload
        payload: String,
    },
    /// Twilio sent `stop`; the call ended normally
    Stop,
    /// The socket dropped without a `stop`
    Disconnected,
}

/// Realtime session configuration for one call.
pub fn build_realtime_config(config: &ServerConfig) -> RealtimeConfig {
    let tenant = &config.tenant;
    RealtimeConfig {
        api_key: config.openai_api_key.clone(),
        model: config.realtime_model.clone(),
        voice: Some(config.realtime_voice.clone()),
        instructions: Some(tenant.instructions.to_string()),
        input_audio_format: Some("g711_ulaw".to_string()),
        output_audio_format: Some("g711_ulaw".to_string()),
        transcription_model: None,
        turn_detection: Some(TurnDetectionConfig {
            threshold: config.vad_threshold,
            prefix_padding_ms: config.vad_prefix_padding_ms,
            silence_duration_ms: config.vad_silence_duration_ms,
        }),
        tools: vec![ToolDefinition {
            name: tenant.tool_name.to_string(),
            description: Some(tenant.tool_description.to_string()),
            parameters: Some(tenant.parameters_schema()),
        }],
    }
}

/// How a call ended. Only a normal `stop` produces an outcome summary;
/// abnormal endings tear down silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallEnd {
    /// Twilio sent `stop`
    Stopped,
    /// The telephony socket dropped without a `stop`
    Disconnected,
    /// The AI leg failed or dropped mid-call
    AiFailed,
}

/// Drives one call from `start` to teardown.
pub struct CallBridge {
    state: AppState,
    session: Arc<Session>,
}

impl CallBridge {
    /// Create the bridge for a freshly registered session.
    pub fn new(state: AppState, session: Arc<Session>) -> Self {
        Self { state, session }
    }

    /// Run the call to completion.
    ///
    /// `telephony_rx` carries decoded inbound events; `outbound_tx` carries
    /// serialized media frames back toward the telephony socket. Returning
    /// drops `outbound_tx`, which is the handler's cue to close the socket.
    pub async fn run(
        self,
        mut telephony_rx: mpsc::Receiver<TelephonyEvent>,
        outbound_tx: mpsc::Sender<String>,
    ) {
        let session = self.session.clone();
        session.transition(CallState::AiConnecting);

        // The handshake runs on its own task so inbound events keep flowing
        // while it is in flight.
        let (connect_tx, mut connect_rx) = oneshot::channel();
        {
            let connector = self.state.connector.clone();
            let config = build_realtime_config(&self.state.config);
            tokio::spawn(async move {
                let _ = connect_tx.send(connector.connect(config).await);
            });
        }

        // Caller audio that arrives before the AI leg is up, bounded so a
        // slow handshake cannot grow memory without limit.
        let mut pending: VecDeque<String> = VecDeque::new();
        let limit = self.state.config.pending_frame_limit;

        let (transport, ai_rx) = loop {
            tokio::select! {
                result = &mut connect_rx => {
                    match result {
                        Ok(Ok(pair)) => break pair,
                        Ok(Err(e)) => {
                            tracing::error!(
                                call_sid = %session.call_sid,
                                "AI connection failed: {e}"
                            );
                            session.transition(CallState::Terminating);
                            self.finish(CallEnd::AiFailed).await;
                            return;
                        }
                        Err(_) => {
                            tracing::error!(
                                call_sid = %session.call_sid,
                                "AI connection task dropped"
                            );
                            session.transition(CallState::Terminating);
                            self.finish(CallEnd::AiFailed).await;
                            return;
                        }
                    }
                }
                event = telephony_rx.recv() => {
                    match event {
                        Some(TelephonyEvent::Media { payload }) => {
                            if pending.len() < limit {
                                pending.push_back(payload);
                            } else {
                                tracing::warn!(
                                    call_sid = %session.call_sid,
                                    limit,
                                    "Dropping caller audio frame; AI handshake still pending"
                                );
                            }
                        }
                        Some(TelephonyEvent::Stop) => {
                            tracing::info!(
                                call_sid = %session.call_sid,
                                "Call stopped before AI connection completed"
                            );
                            session.transition(CallState::Terminating);
                            self.finish(CallEnd::Stopped).await;
                            return;
                        }
                        Some(TelephonyEvent::Disconnected) | None => {
                            tracing::info!(
                                call_sid = %session.call_sid,
                                "Call dropped before AI connection completed"
                            );
                            session.transition(CallState::Terminating);
                            self.finish(CallEnd::Disconnected).await;
                            return;
                        }
                    }
                }
            }
        };

        let transport = Arc::new(Mutex::new(transport));

        // Replay buffered audio in arrival order before going active.
        {
            let guard = transport.lock().await;
            for payload in pending.drain(..) {
                if let Err(e) = guard.send_audio(&payload).await {
                    tracing::error!(
                        call_sid = %session.call_sid,
                        "Failed to replay buffered audio: {e}"
                    );
                    break;
                }
            }
        }

        session.transition(CallState::Active);
        tracing::info!(call_sid = %session.call_sid, "Call active");

        let end = self
            .dispatch(&mut telephony_rx, ai_rx, &outbound_tx, transport.clone())
            .await;

        session.transition(CallState::Terminating);
        transport.lock().await.close().await;
        self.finish(end).await;
    }

    /// The active-call dispatch loop. Returns how the call ended.
    async fn dispatch(
        &self,
        telephony_rx: &mut mpsc::Receiver<TelephonyEvent>,
        mut ai_rx: AiEventReceiver,
        outbound_tx: &mpsc::Sender<String>,
        transport: Arc<Mutex<Box<dyn AiTransport>>>,
    ) -> CallEnd {
        let session = &self.session;
        loop {
            tokio::select! {
                event = telephony_rx.recv() => {
                    match event {
                        Some(TelephonyEvent::Media { payload }) => {
                            let guard = transport.lock().await;
                            if let Err(e) = guard.send_audio(&payload).await {
                                tracing::error!(
                                    call_sid = %session.call_sid,
                                    "Failed to forward caller audio: {e}"
                                );
                                return CallEnd::AiFailed;
                            }
                        }
                        Some(TelephonyEvent::Stop) => {
                            tracing::info!(call_sid = %session.call_sid, "Call stopped");
                            return CallEnd::Stopped;
                        }
                        Some(TelephonyEvent::Disconnected) | None => {
                            tracing::info!(
                                call_sid = %session.call_sid,
                                "Telephony socket disconnected"
                            );
                            return CallEnd::Disconnected;
                        }
                    }
                }
                event = ai_rx.recv() => {
                    match event {
                        Some(AiEvent::AudioDelta { payload }) => {
                            let frame = OutboundMediaFrame::new(&session.stream_sid, payload);
                            match frame.to_json() {
                                Ok(json) => {
                                    if outbound_tx.send(json).await.is_err() {
                                        // Writer gone; the socket is closing.
                                        return CallEnd::Disconnected;
                                    }
                                }
                                Err(e) => {
                                    tracing::error!(
                                        call_sid = %session.call_sid,
                                        "Failed to serialize media frame: {e}"
                                    );
                                }
                            }
                        }
                        Some(AiEvent::SessionReady { session_id }) => {
                            tracing::info!(
                                call_sid = %session.call_sid,
                                ai_session = %session_id,
                                "AI session ready"
                            );
                        }
                        Some(AiEvent::FunctionCall(request)) => {
                            tokio::spawn(handle_function_call(
                                request,
                                self.state.config.tenant.clone(),
                                session.clone(),
                                self.state.record_store.clone(),
                                transport.clone(),
                            ));
                        }
                        Some(AiEvent::Transcript(t)) => {
                            tracing::info!(
                                call_sid = %session.call_sid,
                                role = %t.role,
                                "Transcript: {}",
                                t.text
                            );
                        }
                        Some(AiEvent::Error(e)) => {
                            tracing::error!(call_sid = %session.call_sid, "AI error: {e}");
                            return CallEnd::AiFailed;
                        }
                        Some(AiEvent::Closed) | None => {
                            tracing::warn!(
                                call_sid = %session.call_sid,
                                "AI connection closed mid-call"
                            );
                            return CallEnd::AiFailed;
                        }
                    }
                }
            }
        }
    }

    /// Retire the session. Only a normal `stop` is summarized to analytics;
    /// webhook failures are logged and never block teardown.
    async fn finish(&self, end: CallEnd) {
        let session = &self.session;

        if end == CallEnd::Stopped {
            let tenant = &self.state.config.tenant;
            let collected = session.collected();
            let (decision, reason) = if collected.is_some() {
                (tenant.decision_collected, tenant.reason_collected)
            } else {
                (tenant.decision_empty, tenant.reason_empty)
            };

            let summary = CallSummary {
                call_sid: session.call_sid.clone(),
                caller_phone: session.caller.clone(),
                call_duration: session.duration_secs(),
                timestamp: CallSummary::now_timestamp(),
                call_status: "completed".to_string(),
                decision: decision.to_string(),
                reason: reason.to_string(),
                collected,
            };

            if let Err(e) = self.state.analytics.report_call(&summary).await {
                tracing::warn!(
                    call_sid = %session.call_sid,
                    "Call-data webhook delivery failed: {e}"
                );
            }
            if let Err(e) = self.state.analytics.report_record(&summary).await {
                tracing::warn!(
                    call_sid = %session.call_sid,
                    "Record webhook delivery failed: {e}"
                );
            }
        }

        session.transition(CallState::Closed);
        self.state.sessions.remove(&session.call_sid);
        tracing::info!(
            call_sid = %session.call_sid,
            end = ?end,
            duration = session.duration_secs(),
            "Call finished"
        );
    }
}

/// Resolve one tool invocation and feed the result back into the
/// conversation. Runs off the dispatch loop so a slow store never stalls
/// audio.
async fn handle_function_call(
    request: FunctionCallRequest,
    tenant: TenantProfile,
    session: Arc<Session>,
    store: Option<Arc<dyn RecordStore>>,
    transport: Arc<Mutex<Box<dyn AiTransport>>>,
) {
    let output = resolve_function_call(&request, &tenant, &session, store).await;
    let result = submit_result(&transport, &request.call_id, &output).await;
    if let Err(e) = result {
        tracing::error!(
            call_sid = %session.call_sid,
            call_id = %request.call_id,
            "Failed to submit function result: {e}"
        );
    }
}

async fn submit_result(
    transport: &Arc<Mutex<Box<dyn AiTransport>>>,
    call_id: &str,
    output: &str,
) -> RealtimeResult<()> {
    let guard = transport.lock().await;
    guard.submit_function_result(call_id, output).await
}

/// Validate, persist, and record the tool invocation; the returned string is
/// the JSON tool result for the model.
async fn resolve_function_call(
    request: &FunctionCallRequest,
    tenant: &TenantProfile,
    session: &Session,
    store: Option<Arc<dyn RecordStore>>,
) -> String {
    if request.name != tenant.tool_name {
        tracing::warn!(
            call_sid = %session.call_sid,
            tool = %request.name,
            "AI invoked an undeclared tool"
        );
        return records::failure_output(&ValidationError::UnknownTool(request.name.clone()));
    }

    if session.collected().is_some() {
        tracing::warn!(
            call_sid = %session.call_sid,
            "Rejecting duplicate structured output"
        );
        return records::failure_output(&ValidationError::Duplicate);
    }

    let record = match records::validate_arguments(tenant, &request.arguments) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(
                call_sid = %session.call_sid,
                "Rejecting tool invocation: {e}"
            );
            return records::failure_output(&e);
        }
    };

    if let Some(store) = store {
        // The stored row carries the call metadata; the in-session copy keeps
        // the tenant fields only (the record webhook enriches separately).
        let mut row = record.clone();
        if let Some(object) = row.as_object_mut() {
            object.insert("call_sid".to_string(), json!(session.call_sid));
            object.insert("created_at".to_string(), json!(CallSummary::now_timestamp()));
        }
        if let Err(e) = store.insert(tenant.table, &row).await {
            tracing::error!(call_sid = %session.call_sid, "Record insert failed: {e}");
            return records::store_failure_output();
        }
    }

    if !session.try_set_collected(record) {
        return records::failure_output(&ValidationError::Duplicate);
    }

    tracing::info!(
        call_sid = %session.call_sid,
        table = tenant.table,
        "Structured record collected"
    );
    records::success_output(tenant)
}
