//! Text-to-speech endpoints

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::auth::require_api_key;
use super::ApiState;
use crate::speech::split_chunks;
use crate::voice::{synthesize_chunks, SpeechSynthesizer};

/// Header reporting how many chunks a streamed response is made of
pub const CHUNK_COUNT_HEADER: &str = "x-tts-chunks";

/// Build TTS router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(synthesize))
        .route("/stream", post(synthesize_stream))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: String,
    /// Voice identifier; the configured default when absent
    #[serde(default)]
    pub voice: Option<String>,
}

/// Validate the request and pick the synthesizer
fn prepare(
    state: &ApiState,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<(Arc<dyn SpeechSynthesizer>, SynthesizeRequest), VoiceError> {
    let Json(request) = payload.map_err(|e| VoiceError::BadRequest(e.body_text()))?;

    if request.text.trim().is_empty() {
        return Err(VoiceError::BadRequest("No text provided".to_string()));
    }

    let tts = state
        .tts
        .clone()
        .ok_or(VoiceError::NotConfigured("TTS not configured"))?;

    Ok((tts, request))
}

/// Synthesize text to speech in one piece
///
/// Returns audio in MP3 format
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Response, VoiceError> {
    let (tts, request) = prepare(&state, payload)?;

    let audio = tts
        .synthesize(&request.text, request.voice.as_deref())
        .await
        .map_err(|e| VoiceError::SynthesisFailed(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::CONTENT_LENGTH, audio.len().to_string()),
        ],
        audio,
    )
        .into_response())
}

/// Synthesize text chunk by chunk and stream the audio in order
///
/// Playback can start as soon as the first chunk is ready. A chunk that
/// fails to synthesize ends the stream early.
async fn synthesize_stream(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Response, VoiceError> {
    let (tts, request) = prepare(&state, payload)?;

    let chunks = split_chunks(&request.text, state.chunk_chars);
    let count = chunks.len();
    tracing::debug!(chunks = count, "streaming speech");

    let stream = synthesize_chunks(tts, chunks, request.voice, state.tts_concurrency);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (header::HeaderName::from_static(CHUNK_COUNT_HEADER), count.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    NotConfigured(&'static str),
    BadRequest(String),
    SynthesisFailed(String),
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::SynthesisFailed(msg) => {
                tracing::error!(error = %msg, "TTS request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
