//! Tests for [`HttpCompletionEngine`] against a wiremock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use heimdallr::engine::{CompletionEngine, HttpCompletionEngine};
use heimdallr::types::{CallerId, Usage};
use heimdallr::HeimdallrError;

fn engine_for(server: &MockServer) -> HttpCompletionEngine {
    HttpCompletionEngine::new(server.uri(), "test-key").unwrap()
}

#[tokio::test]
async fn successful_generation_maps_the_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "message": "What is forgiveness?",
            "context": "general",
            "user": "u1",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Forgiveness is release.",
            "model": "engine-v2",
            "tokens_in": 12,
            "tokens_out": 34,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let completion = engine
        .generate("What is forgiveness?", Some("general"), &CallerId::new("u1"))
        .await
        .unwrap();

    assert_eq!(completion.text, "Forgiveness is release.");
    assert_eq!(completion.model.as_deref(), Some("engine-v2"));
    assert_eq!(completion.usage, Usage::new(12, 34));
}

#[tokio::test]
async fn context_is_omitted_when_absent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "hi",
            "tokens_in": 1,
            "tokens_out": 1,
        })))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let completion = engine
        .generate("hello", None, &CallerId::new("u1"))
        .await
        .unwrap();
    assert_eq!(completion.text, "hi");
    // model is optional in the engine's reply
    assert!(completion.model.is_none());
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let err = engine
        .generate("hello", None, &CallerId::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, HeimdallrError::RateLimited));
    assert!(err.is_transient());
}

#[tokio::test]
async fn server_error_maps_to_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let err = engine
        .generate("hello", None, &CallerId::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, HeimdallrError::Upstream(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_required() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let err = engine
        .generate("hello", None, &CallerId::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, HeimdallrError::AuthenticationRequired));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn other_client_errors_keep_their_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let err = engine
        .generate("hello", None, &CallerId::new("u1"))
        .await
        .unwrap_err();
    match err {
        HeimdallrError::Api { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "bad payload");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_reply_text_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "",
            "tokens_in": 1,
            "tokens_out": 0,
        })))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let err = engine
        .generate("hello", None, &CallerId::new("u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, HeimdallrError::EmptyResponse));
}
