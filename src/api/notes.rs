//! Student notes endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::auth::require_api_key;
use super::ApiState;
use crate::Error;

/// Build notes router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(list).post(append).delete(clear))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// Notes listing
#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<String>,
}

/// New note
#[derive(Debug, Deserialize)]
pub struct AppendNoteRequest {
    pub note: String,
}

async fn list(State(state): State<Arc<ApiState>>) -> Json<NotesResponse> {
    Json(NotesResponse {
        notes: state.notes.lines().await,
    })
}

async fn append(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<AppendNoteRequest>, JsonRejection>,
) -> Result<StatusCode, NotesError> {
    let Json(request) = payload.map_err(|e| NotesError::BadRequest(e.body_text()))?;

    state.notes.append(&request.note).await.map_err(|e| match e {
        Error::Notes(msg) => NotesError::BadRequest(msg),
        other => NotesError::Storage(other.to_string()),
    })?;

    Ok(StatusCode::CREATED)
}

async fn clear(State(state): State<Arc<ApiState>>) -> Result<StatusCode, NotesError> {
    state
        .notes
        .clear()
        .await
        .map_err(|e| NotesError::Storage(e.to_string()))?;
    tracing::info!("student notes cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// Notes API errors
#[derive(Debug)]
pub enum NotesError {
    BadRequest(String),
    Storage(String),
}

impl IntoResponse for NotesError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Storage(msg) => {
                tracing::error!(error = %msg, "notes storage failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}
