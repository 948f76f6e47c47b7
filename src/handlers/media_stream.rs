//! Twilio media stream WebSocket handler.
//!
//! Twilio connects here when a call's TwiML opens a `<Stream>`. The handler
//! does socket plumbing only: it waits for the `start` message, registers the
//! session, spawns the call's [`CallBridge`], and from then on forwards
//! decoded inbound events to the bridge and serialized outbound frames back
//! to the socket. All call semantics live in the bridge.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::bridge::{CallBridge, Session, TelephonyEvent};
use crate::state::AppState;
use crate::telephony::{StreamStart, TwilioMessage};

/// Channel capacity between the socket tasks and the bridge.
const CHANNEL_CAPACITY: usize = 256;

/// Upgrade `/media-stream` to a WebSocket.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_media_stream(socket, state))
}

async fn handle_media_stream(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let Some((stream_sid, meta)) = await_start(&mut ws_receiver).await else {
        return;
    };

    let call_sid = meta.call_sid.clone();
    let caller = meta.caller().map(str::to_string);
    tracing::info!(
        call_sid = %call_sid,
        stream_sid = %stream_sid,
        caller = ?caller,
        "Media stream started"
    );

    let Some(session) = state
        .sessions
        .insert(Session::new(call_sid.clone(), stream_sid, caller))
    else {
        tracing::warn!(
            call_sid = %call_sid,
            "Stream start for a call that is already live; closing socket"
        );
        return;
    };

    let (telephony_tx, telephony_rx) = mpsc::channel::<TelephonyEvent>(CHANNEL_CAPACITY);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let bridge = CallBridge::new(state.clone(), session);
    let bridge_task = tokio::spawn(bridge.run(telephony_rx, outbound_tx));

    // Writer task: the bridge dropping its sender ends this loop, which is
    // the cue to close the socket.
    let writer_task = tokio::spawn(async move {
        while let Some(json) = outbound_rx.recv().await {
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Reader loop: decode and forward until the call ends.
    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match TwilioMessage::parse(&text) {
                Ok(TwilioMessage::Media { media }) => {
                    if telephony_tx
                        .send(TelephonyEvent::Media {
                            payload: media.payload,
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(TwilioMessage::Stop { .. }) => {
                    let _ = telephony_tx.send(TelephonyEvent::Stop).await;
                    break;
                }
                Ok(TwilioMessage::Start { .. }) => {
                    tracing::warn!(call_sid = %call_sid, "Ignoring repeated start message");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(call_sid = %call_sid, "Unparseable stream message: {e}");
                }
            },
            Ok(Message::Close(_)) => {
                let _ = telephony_tx.send(TelephonyEvent::Disconnected).await;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(call_sid = %call_sid, "Media stream socket error: {e}");
                let _ = telephony_tx.send(TelephonyEvent::Disconnected).await;
                break;
            }
        }
    }
    drop(telephony_tx);

    let _ = bridge_task.await;
    let _ = writer_task.await;
    tracing::info!(call_sid = %call_sid, "Media stream closed");
}

/// Read until the `start` message arrives. Returns `None` when the socket
/// ends first.
async fn await_start(ws_receiver: &mut SplitStream<WebSocket>) -> Option<(String, StreamStart)> {
    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => match TwilioMessage::parse(&text) {
                Ok(TwilioMessage::Connected { protocol }) => {
                    tracing::debug!(protocol = ?protocol, "Media stream connected");
                }
                Ok(TwilioMessage::Start { stream_sid, start }) => {
                    return Some((stream_sid, start));
                }
                Ok(TwilioMessage::Stop { .. }) => {
                    tracing::info!("Media stream stopped before start");
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Unparseable stream message before start: {e}");
                }
            },
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!("Media stream socket error before start: {e}");
                return None;
            }
        }
    }
}
