//! Integration tests for GeminiClient against a mock HTTP server.

use gemini_client::{GeminiClient, GenerationError, TextGenerator};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn generate_returns_candidate_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-pro:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Waves crash upon the shore" }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GeminiClient::new("test-key").with_base_url(mock_server.uri());
    let text = client
        .generate("gemini-2.5-pro", "Write a poem about the sea", 0.5)
        .await
        .expect("generation succeeds");

    assert_eq!(text, "Waves crash upon the shore");
}

#[tokio::test]
async fn generate_sends_fixed_sampling_policy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "parts": [{ "text": "rewrite this" }] }],
            "generationConfig": {
                "temperature": 0.2,
                "topP": 1.0,
                "topK": 1,
                "maxOutputTokens": 4096
            },
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_ONLY_HIGH" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_ONLY_HIGH" },
                { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_ONLY_HIGH" },
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_ONLY_HIGH" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "rewritten" }] } }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GeminiClient::new("test-key").with_base_url(mock_server.uri());
    let text = client
        .generate("gemini-2.5-flash", "rewrite this", 0.2)
        .await
        .expect("generation succeeds");

    assert_eq!(text, "rewritten");
}

#[tokio::test]
async fn generate_maps_auth_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"error": "API key invalid"}"#))
        .mount(&mock_server)
        .await;

    let client = GeminiClient::new("bad-key").with_base_url(mock_server.uri());
    let error = client
        .generate("gemini-2.5-pro", "prompt", 0.5)
        .await
        .expect_err("auth failure");

    assert!(matches!(error, GenerationError::Auth(_)));
}

#[tokio::test]
async fn generate_maps_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&mock_server)
        .await;

    let client = GeminiClient::new("test-key").with_base_url(mock_server.uri());
    let error = client
        .generate("gemini-2.5-pro", "prompt", 0.5)
        .await
        .expect_err("server error");

    match error {
        GenerationError::Api(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("internal"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn generate_treats_empty_candidates_as_api_error() {
    let mock_server = MockServer::start().await;

    // Shape seen when all candidates are filtered out
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        })))
        .mount(&mock_server)
        .await;

    let client = GeminiClient::new("test-key").with_base_url(mock_server.uri());
    let error = client
        .generate("gemini-2.5-pro", "prompt", 0.5)
        .await
        .expect_err("no text");

    match error {
        GenerationError::Api(message) => assert!(message.contains("SAFETY")),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn generate_surfaces_transport_errors() {
    // Nothing listening on this port
    let client = GeminiClient::new("test-key").with_base_url("http://127.0.0.1:1");
    let error = client
        .generate("gemini-2.5-pro", "prompt", 0.5)
        .await
        .expect_err("transport failure");

    assert!(matches!(error, GenerationError::Http(_)));
}
