//! Contract tests for the code synthesis client against a mock provider

use hero_bridge::core::error::BridgeError;
use hero_bridge::core::SynthesisConfig;
use hero_bridge::llm::{SynthesisClient, SynthesisRequest};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout_secs: u64) -> SynthesisClient {
    let config = SynthesisConfig {
        api_url: format!("{}/v1/chat/completions", server.uri()),
        api_key: Some("test-key".into()),
        timeout_secs,
        ..SynthesisConfig::default()
    };
    SynthesisClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_returns_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "Implement: \"do a backflip\" in scripted_flight/"}],
            "max_tokens": 300,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "print('flip')"}},
                {"message": {"role": "assistant", "content": "print('second')"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let code = client_for(&server, 5)
        .synthesize("Implement: \"do a backflip\" in scripted_flight/", 300, 0.7)
        .await
        .unwrap();
    assert_eq!(code, "print('flip')");
}

#[tokio::test]
async fn test_legacy_text_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"text": "print('legacy')"}]
        })))
        .mount(&server)
        .await;

    let code = client_for(&server, 5).synthesize("x", 10, 0.5).await.unwrap();
    assert_eq!(code, "print('legacy')");
}

#[tokio::test]
async fn test_unset_parameters_use_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"max_tokens": 200})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = SynthesisRequest {
        prompt: "hello".into(),
        max_tokens: None,
        temperature: None,
    };
    assert_eq!(client_for(&server, 5).complete(&request).await.unwrap(), "ok");
}

#[tokio::test]
async fn test_provider_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Wrong API Key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let result = client_for(&server, 5).synthesize("x", 10, 0.5).await;
    match result {
        Err(BridgeError::SynthesisUnavailable { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Wrong API Key");
        }
        other => panic!("expected SynthesisUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_defaults_to_server_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = client_for(&server, 1).synthesize("x", 10, 0.5).await;
    assert!(matches!(
        result,
        Err(BridgeError::SynthesisUnavailable { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_empty_choices_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let result = client_for(&server, 5).synthesize("x", 10, 0.5).await;
    assert!(matches!(
        result,
        Err(BridgeError::SynthesisUnavailable { .. })
    ));
}
