//! Optional API key guard for `/api/*`
//!
//! Keys are compared as SHA-256 digests, folding every byte, so the check
//! takes the same time however much of the key a caller gets right.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::ApiState;

/// Header accepted in place of `Authorization: Bearer`
pub const API_KEY_HEADER: &str = "x-api-key";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Key presented by the caller, from a bearer token or `x-api-key`
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, header::AUTHORIZATION.as_str())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| header_str(headers, API_KEY_HEADER))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Whether `presented` equals the configured key
fn keys_match(presented: &str, expected: &SecretString) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.expose_secret().as_bytes());

    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Reject requests without the configured key; no key configured lets
/// everything through
pub async fn require_api_key(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(req).await;
    };

    match presented_key(req.headers()) {
        Some(key) if keys_match(key, expected) => next.run(req).await,
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "invalid API key");
            unauthorized("Invalid API key")
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "missing API key");
            unauthorized("API key required")
        }
    }
}

fn unauthorized(message: &'static str) -> Response {
    #[derive(Serialize)]
    struct ErrorResponse {
        error: &'static str,
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(ErrorResponse { error: message }),
    )
        .into_response()
}
