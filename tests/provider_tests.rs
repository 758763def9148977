use masterpiece_ai_meter::{
    config::AiProviderConfig,
    models::ChatMessage,
    services::ai_provider::{AiProvider, AnthropicProvider, CompletionRequest, ProviderError},
};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn provider(server: &MockServer) -> AnthropicProvider {
    AnthropicProvider::new(&AiProviderConfig {
        api_key: "test-key".to_string(),
        base_url: server.uri(),
        model: "claude-test".to_string(),
        max_tokens: 256,
        request_timeout_secs: 5,
    })
    .expect("client builds")
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system: Some("You are a kind journaling mentor.".to_string()),
        messages: vec![ChatMessage::user("What went well today?")],
    }
}

#[tokio::test]
async fn test_complete_parses_text_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-test",
            "max_tokens": 256,
            "system": "You are a kind journaling mentor.",
            "messages": [{ "role": "user", "content": "What went well today?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-test-20261001",
            "content": [
                { "type": "text", "text": "You showed up. " },
                { "type": "tool_use", "id": "t1", "name": "noop", "input": {} },
                { "type": "text", "text": "That counts." }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 21, "output_tokens": 9 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = provider(&server).complete(&request()).await.unwrap();

    assert_eq!(completion.text, "You showed up. That counts.");
    assert_eq!(completion.model, "claude-test-20261001");
    assert_eq!(completion.input_tokens, 21);
    assert_eq!(completion.output_tokens, 9);
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 529);
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_response_without_text_keeps_billed_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "claude-test",
            "content": [{ "type": "tool_use", "id": "t1", "name": "noop", "input": {} }],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 700, "output_tokens": 16 }
        })))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    match &err {
        ProviderError::EmptyResponse {
            model,
            input_tokens,
            output_tokens,
        } => {
            assert_eq!(model, "claude-test");
            assert_eq!(*input_tokens, 700);
            assert_eq!(*output_tokens, 16);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.billed_usage(), Some(("claude-test", 700, 16)));
}

#[tokio::test]
async fn test_malformed_body_is_a_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
    assert_eq!(err.billed_usage(), None);
}
