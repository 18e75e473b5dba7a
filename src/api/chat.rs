//! Conversation endpoint backed by the tutor agent

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::auth::require_api_key;
use super::ApiState;
use crate::agent::SessionInfo;

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(chat))
        .route("/reset", post(reset))
        .route("/session", get(session))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// Speaker of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// One message of the client-side transcript
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Chat request carrying the whole transcript
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answer the latest user message
///
/// The agent keeps its own session, so only the newest user message is
/// forwarded; earlier transcript entries are for the client's display.
async fn chat(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(request) = payload.map_err(|e| ChatError::BadRequest(e.body_text()))?;

    if request.messages.is_empty() {
        return Err(ChatError::BadRequest("No messages provided".to_string()));
    }

    let last_user = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .ok_or_else(|| ChatError::BadRequest("No user message found".to_string()))?;

    let prompt = last_user.content.trim();
    if prompt.is_empty() {
        return Err(ChatError::BadRequest("User message is empty".to_string()));
    }

    let message = state
        .agent
        .reply(prompt)
        .await
        .map_err(|e| ChatError::Agent(e.to_string()))?;

    Ok(Json(ChatResponse {
        message,
        error: None,
    }))
}

/// Drop the agent session so the next message starts a new conversation
async fn reset(State(state): State<Arc<ApiState>>) -> StatusCode {
    state.agent.reset().await;
    StatusCode::NO_CONTENT
}

/// Current session snapshot
async fn session(State(state): State<Arc<ApiState>>) -> Json<SessionInfo> {
    Json(state.agent.session().await)
}

/// Chat API errors
#[derive(Debug)]
pub enum ChatError {
    BadRequest(String),
    Agent(String),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Agent(msg) => {
                tracing::error!(error = %msg, "chat request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (
            status,
            Json(ChatResponse {
                message: String::new(),
                error: Some(error),
            }),
        )
            .into_response()
    }
}
