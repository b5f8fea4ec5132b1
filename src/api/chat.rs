use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiError, ApiResult, AppState};
use crate::llm::ConversationMessage;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello, world!" }))
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(req) = payload.map_err(|_| ApiError::BadRequest("Message is required".into()))?;

    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Message is required".into()))?;

    tracing::debug!(
        mode = state.llm.mode(),
        history = req.conversation_history.len(),
        "chat request"
    );

    let response = state
        .llm
        .chat_with_ai(&message, &req.conversation_history)
        .await;
    Ok(Json(ChatResponse { response }))
}
