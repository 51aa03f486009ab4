//! HTTP handlers. Each one is a thin adapter over [`ChatService`].
//!
//! [`ChatService`]: parley_engine::ChatService

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use parley_core::context::Exchange;
use parley_core::ids::SessionId;

use crate::error::ApiError;
use crate::server::AppState;

/// Body of `POST /chat`. A missing prompt counts as an empty message.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PromptResponse {
    pub response: String,
    pub session_id: SessionId,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: SessionId,
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: SessionId,
    pub exchanges: Vec<Exchange>,
}

pub async fn home() -> &'static str {
    "Hello, World!"
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.chat.sessions();
    Json(json!({
        "status": "healthy",
        "model": state.chat.generator().model(),
        "sessions": sessions.len(),
        "window": sessions.window(),
    }))
}

/// `POST /chat`: single-field prompt API. Clients that don't name a
/// session all share the `default` conversation.
pub async fn prompt(
    State(state): State<AppState>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let session_id = req.session_id.unwrap_or_else(SessionId::shared);
    let reply = state.chat.chat(&session_id, &req.prompt).await?;
    Ok(Json(PromptResponse {
        response: reply.reply,
        session_id: reply.session_id,
    }))
}

/// `POST /api/chat`: session-aware chat used by the web UI. A request
/// without a session id starts a new conversation.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = req.session_id.unwrap_or_default();
    let reply = state.chat.chat(&session_id, &req.message).await?;
    Ok(Json(ChatResponse {
        session_id: reply.session_id,
        response: reply.reply,
    }))
}

pub async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session_id = SessionId::from_raw(id);
    let exchanges = state
        .chat
        .history(&session_id)
        .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;
    Ok(Json(HistoryResponse {
        session_id,
        exchanges,
    }))
}

pub async fn session_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let deleted = state.chat.reset(&SessionId::from_raw(id));
    Json(json!({ "deleted": deleted }))
}
