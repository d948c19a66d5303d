//! HTTP-level tests for the analysis client against a mock server.

use std::time::Duration;

use serde_json::json;
use vigil_client::{AnalysisClient, RetryConfig, VigilError};
use vigil_core::AnalysisService;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/test-vision:generateContent";

fn client_for(server: &MockServer, retry: RetryConfig) -> AnalysisClient {
    AnalysisClient::builder("test-key")
        .base_url(server.uri())
        .model("test-vision")
        .timeout(Duration::from_secs(5))
        .retry(retry)
        .build()
        .unwrap()
}

fn fast_retry(max: u32) -> RetryConfig {
    RetryConfig::new()
        .max_retries(max)
        .initial_backoff(Duration::from_millis(1))
        .max_backoff(Duration::from_millis(2))
}

fn text_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            { "content": { "parts": [ { "text": text } ] } }
        ]
    })
}

#[tokio::test]
async fn test_infer_returns_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [ { "parts": [ { "text": "score this frame" } ] } ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("{\"behavioral_score\": 90}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, RetryConfig::disabled());
    let text = client
        .infer("score this frame", &[0xff, 0xd8, 0xff])
        .await
        .unwrap();
    assert_eq!(text, "{\"behavioral_score\": 90}");
}

#[tokio::test]
async fn test_unauthorized_maps_to_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "error": { "message": "API key not valid" } })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, fast_retry(3));
    let err = client.generate("x", b"img").await.unwrap_err();
    assert!(matches!(err, VigilError::Unauthorized));
}

#[tokio::test]
async fn test_api_error_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": { "message": "image too small" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, fast_retry(3));
    match client.generate("x", b"img").await.unwrap_err() {
        VigilError::Api { code, message } => {
            assert_eq!(code, 400);
            assert_eq!(message, "image too small");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("ok")))
        .mount(&server)
        .await;

    let client = client_for(&server, fast_retry(2));
    assert_eq!(client.generate("x", b"img").await.unwrap(), "ok");
}

#[tokio::test]
async fn test_server_error_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server, fast_retry(2));
    let err = client.generate("x", b"img").await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
}

#[tokio::test]
async fn test_blank_candidate_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server, RetryConfig::disabled());
    let err = client.generate("x", b"img").await.unwrap_err();
    assert!(matches!(err, VigilError::EmptyResponse));
}

#[tokio::test]
async fn test_retry_after_header_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, RetryConfig::disabled());
    let err = client.infer("score", b"img").await.unwrap_err();
    assert!(matches!(err, VigilError::RateLimited { retry_after: Some(7) }));
    assert_eq!(err.status_code(), Some(429));
}
