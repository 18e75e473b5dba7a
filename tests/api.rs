//! HTTP API tests driven through the router

mod common;

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    Router,
};
use common::{FakeTts, agent, agent_config};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use voice_tutor::api::voice::CHUNK_COUNT_HEADER;
use voice_tutor::{ApiServerBuilder, TutorAgent};

fn missing_agent(dir: &Path) -> Arc<TutorAgent> {
    agent(agent_config(&dir.join("no-such-agent"), dir), dir)
}

fn app(tutor: Arc<TutorAgent>) -> ApiServerBuilder {
    ApiServerBuilder::new(tutor, 0)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(
    router: &Router,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let (status, body) = send_json(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_ready_degraded_without_agent() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let (status, body) = send_json(&router, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["agent"]["status"], "fail");
    assert_eq!(body["checks"]["tts"]["status"], "unavailable");
}

#[cfg(unix)]
#[tokio::test]
async fn test_ready_with_agent_and_tts() {
    let dir = tempfile::tempdir().unwrap();
    let script = common::fake_agent(dir.path(), "echo hi");
    let router = app(agent(agent_config(&script, dir.path()), dir.path()))
        .tts(Arc::new(FakeTts { fail: false }))
        .build()
        .router();

    let (status, body) = send_json(&router, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["tts"]["status"], "ok");
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_chat_rejects_empty_transcript() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let request = post_json("/api/chat", &json!({ "messages": [] }));
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "", "error": "No messages provided" }));
}

#[tokio::test]
async fn test_chat_requires_user_message() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let request = post_json(
        "/api/chat",
        &json!({ "messages": [{ "role": "assistant", "content": "Hello! I'm Emma." }] }),
    );
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No user message found");
}

#[tokio::test]
async fn test_chat_rejects_blank_user_message() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let request = post_json(
        "/api/chat",
        &json!({ "messages": [{ "role": "user", "content": "   " }] }),
    );
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User message is empty");
}

#[tokio::test]
async fn test_chat_rejects_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "");
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_agent_failure_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let request = post_json(
        "/api/chat",
        &json!({ "messages": [{ "role": "user", "content": "Hello" }] }),
    );
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "");
    assert!(body["error"].as_str().unwrap().starts_with("failed to spawn agent"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_chat_answers_latest_user_message() {
    let dir = tempfile::tempdir().unwrap();
    let script = common::fake_agent(
        dir.path(),
        r#"printf '{"result":"You said: %s","session_id":"abc"}' "$2""#,
    );
    let router = app(agent(agent_config(&script, dir.path()), dir.path()))
        .build()
        .router();

    let request = post_json(
        "/api/chat",
        &json!({ "messages": [
            { "id": "1", "role": "user", "content": "first", "timestamp": 1 },
            { "id": "2", "role": "assistant", "content": "Tell me more", "timestamp": 2 },
            { "id": "3", "role": "user", "content": "  second  ", "timestamp": 3 },
        ] }),
    );
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "You said: second" }));

    let (status, session) = send_json(&router, get("/api/chat/session")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["id"], "abc");
    assert_eq!(session["turns"], 1);

    let reset = Request::builder()
        .method("POST")
        .uri("/api/chat/reset")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, reset).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, session) = send_json(&router, get("/api/chat/session")).await;
    assert!(session["id"].is_null());
    assert_eq!(session["turns"], 0);
}

// ---------------------------------------------------------------------------
// Text-to-speech
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_tts_requires_text() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path()))
        .tts(Arc::new(FakeTts { fail: false }))
        .build()
        .router();

    let (status, body) = send_json(&router, post_json("/api/tts", &json!({ "text": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No text provided" }));

    let (status, _) = send_json(&router, post_json("/api/tts", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tts_not_configured() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let request = post_json("/api/tts", &json!({ "text": "Hello" }));
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "TTS not configured");
}

#[tokio::test]
async fn test_tts_returns_mp3() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path()))
        .tts(Arc::new(FakeTts { fail: false }))
        .build()
        .router();

    let request = post_json("/api/tts", &json!({ "text": "Hello there" }));
    let (status, headers, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(headers[header::CONTENT_LENGTH], body.len().to_string().as_str());
    assert_eq!(body, b"[en-US-AriaNeural:Hello there]");

    let request = post_json("/api/tts", &json!({ "text": "Hi", "voice": "en-GB-SoniaNeural" }));
    let (_, _, body) = send(&router, request).await;
    assert_eq!(body, b"[en-GB-SoniaNeural:Hi]");
}

#[tokio::test]
async fn test_tts_failure_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path()))
        .tts(Arc::new(FakeTts { fail: true }))
        .build()
        .router();

    let request = post_json("/api/tts", &json!({ "text": "Hello" }));
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("upstream returned 500"));
}

#[tokio::test]
async fn test_tts_stream_keeps_chunk_order() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path()))
        .tts(Arc::new(FakeTts { fail: false }))
        .build()
        .router();

    let sentence = "This sentence is long enough to fill a chunk alone.";
    let text = format!("{sentence} {sentence} {sentence}");
    let expected_chunks = voice_tutor::split_chunks(&text, 100);

    let request = post_json("/api/tts/stream", &json!({ "text": text }));
    let (status, headers, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        headers[CHUNK_COUNT_HEADER],
        expected_chunks.len().to_string().as_str()
    );

    let expected: String = expected_chunks
        .iter()
        .map(|c| format!("[en-US-AriaNeural:{c}]"))
        .collect();
    assert_eq!(String::from_utf8(body).unwrap(), expected);
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_notes_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path())).build().router();

    let (status, body) = send_json(&router, get("/api/notes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "notes": [] }));

    let request = post_json("/api/notes", &json!({ "note": "Works as a nurse" }));
    let (status, _, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let request = post_json("/api/notes", &json!({ "note": "Says \"I have went\"" }));
    let (status, _, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send_json(&router, get("/api/notes")).await;
    assert_eq!(
        body,
        json!({ "notes": ["Works as a nurse", "Says \"I have went\""] })
    );

    let (status, body) = send_json(&router, post_json("/api/notes", &json!({ "note": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "note is empty");

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/notes")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send_json(&router, get("/api/notes")).await;
    assert_eq!(body, json!({ "notes": [] }));
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path()))
        .api_key(Some(SecretString::from("secret")))
        .build()
        .router();

    let (status, headers, body) = send(&router, get("/api/notes")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "API key required");

    let wrong = Request::builder()
        .uri("/api/notes")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .uri("/api/notes")
        .header(header::AUTHORIZATION, "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, right).await;
    assert_eq!(status, StatusCode::OK);

    let via_header = Request::builder()
        .uri("/api/notes")
        .header("x-api-key", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, via_header).await;
    assert_eq!(status, StatusCode::OK);

    // Probes stay open
    let (status, _, _) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path()))
        .rate_limit(Some(1))
        .build()
        .router();

    let (status, _, _) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, headers, body) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "Too many requests");
}

#[tokio::test]
async fn test_cors_exposes_chunk_count() {
    let dir = tempfile::tempdir().unwrap();
    let router = app(missing_agent(dir.path()))
        .tts(Arc::new(FakeTts { fail: false }))
        .build()
        .router();

    let request = Request::builder()
        .method("POST")
        .uri("/api/tts/stream")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "text": "Hello." }).to_string()))
        .unwrap();
    let (status, headers, _) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    let exposed = headers[header::ACCESS_CONTROL_EXPOSE_HEADERS].to_str().unwrap();
    assert!(exposed.to_ascii_lowercase().contains(CHUNK_COUNT_HEADER));
}

// ---------------------------------------------------------------------------
// Static client
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_static_client_served_with_index_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("static");
    std::fs::create_dir_all(&site).unwrap();
    std::fs::write(site.join("index.html"), "<h1>tutor</h1>").unwrap();
    std::fs::write(site.join("app.js"), "console.log(1)").unwrap();

    let router = app(missing_agent(dir.path()))
        .static_dir(Some(site))
        .build()
        .router();

    let (status, _, body) = send(&router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>tutor</h1>");

    let (_, _, body) = send(&router, get("/app.js")).await;
    assert_eq!(body, b"console.log(1)");

    let (_, _, body) = send(&router, get("/some/client/route")).await;
    assert_eq!(body, b"<h1>tutor</h1>");
}

#[tokio::test]
async fn test_bundled_client_streams_and_cancels_playback() {
    let dir = tempfile::tempdir().unwrap();
    let site = Path::new(env!("CARGO_MANIFEST_DIR")).join("static");
    let router = app(missing_agent(dir.path()))
        .static_dir(Some(site))
        .build()
        .router();

    let (status, _, body) = send(&router, get("/")).await;
    assert_eq!(status, StatusCode::OK);

    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("/api/tts/stream"));
    assert!(page.contains("getReader()"));
    assert!(page.contains("new MediaSource()"));
    assert!(page.contains("signal: controller.signal"));
    assert!(page.contains("controller.abort()"));
}
