//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

mod common;
use common::{FailingSynthesizer, FakeSynthesizer, build_test_router};

/// POST a raw body to `/api/chat` and return the parsed JSON reply
async fn post_chat(app: axum::Router, body: &'static str) -> serde_json::Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_index_page() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), None);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("/api/chat"));
    assert!(html.contains("audio_url"));
}

#[tokio::test]
async fn test_chat_local_rule_with_audio() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), Some(Arc::new(FakeSynthesizer)));

    let json = post_chat(app, r#"{"message": "Who are you?"}"#).await;

    assert_eq!(json["reply"], "I am Malik, your intelligent assistant.");

    let url = json["audio_url"].as_str().unwrap();
    let file_name = url.strip_prefix("/static/audio/").unwrap();
    assert!(file_name.ends_with(".mp3"));

    let saved = std::fs::read(dir.path().join("audio").join(file_name)).unwrap();
    assert_eq!(saved, b"ID3I am Malik, your intelligent assistant.");
}

#[tokio::test]
async fn test_chat_falls_through_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), Some(Arc::new(FakeSynthesizer)));

    let json = post_chat(app, r#"{"message": "  explain rust ownership "}"#).await;

    assert_eq!(json["reply"], "echo: explain rust ownership");
}

#[tokio::test]
async fn test_chat_audio_url_null_when_synthesis_fails() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), Some(Arc::new(FailingSynthesizer)));

    let json = post_chat(app, r#"{"message": "tell me a joke"}"#).await;

    assert_eq!(
        json["reply"],
        "Why did the AI go broke? Because it had too many neural debts!"
    );
    assert!(json["audio_url"].is_null());
}

#[tokio::test]
async fn test_chat_without_synthesizer_is_text_only() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), None);

    let json = post_chat(app, r#"{"message": "quit"}"#).await;

    assert_eq!(json["reply"], "Shutting down. Goodbye.");
    assert!(json["audio_url"].is_null());
}

#[tokio::test]
async fn test_chat_missing_message_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), None);

    let json = post_chat(app, "{}").await;

    assert_eq!(json["reply"], "Say something so I can help you.");
}

#[tokio::test]
async fn test_chat_ignores_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(r#"{"message": "what's your name"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["reply"], "I am Malik, your intelligent assistant.");
}

#[tokio::test]
async fn test_generated_audio_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_router(dir.path(), Some(Arc::new(FakeSynthesizer)));

    let json = post_chat(app.clone(), r#"{"message": "joke"}"#).await;
    let url = json["audio_url"].as_str().unwrap().to_string();

    let response = app
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.starts_with(b"ID3"));
}
