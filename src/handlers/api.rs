//! HTTP API handlers.

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// `GET /health` - liveness plus a snapshot of the gateway.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tenant": state.config.tenant.id,
        "active_calls": state.sessions.len(),
        "record_store": state.record_store.is_some(),
    }))
}

/// `GET /calls/{call_sid}` - state of one live call.
pub async fn call_status(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> AppResult<Json<Value>> {
    let session = state
        .sessions
        .get(&call_sid)
        .ok_or_else(|| AppError::NotFound(format!("no live call {call_sid}")))?;

    Ok(Json(json!({
        "call_sid": session.call_sid,
        "stream_sid": session.stream_sid,
        "caller": session.caller,
        "state": session.state().to_string(),
        "duration_secs": session.duration_secs(),
        "collected": session.collected().is_some(),
    })))
}
