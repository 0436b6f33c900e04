//! Provider tests against mocked HTTP endpoints.

use std::sync::Arc;

use drcare_core::{
    ConsultationHandler, ContentPart, ContextStore, DrCareConfig, DrCareError, ErrorCode,
    GenerationOptions, Llm, LlmConfig, LlmProvider, Message,
};
use drcare_llm::{AnthropicLlm, LlmFactory, OpenAICompatibleLlm};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, api_key: Option<&str>) -> LlmConfig {
    LlmConfig {
        api_key: api_key.map(str::to_string),
        base_url: Some(server.uri()),
        ..Default::default()
    }
}

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "llama-3.3-70b-versatile",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    })
}

#[tokio::test]
async fn test_groq_text_completion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "messages": [
                { "role": "system", "content": "be brief" },
                { "role": "user", "content": "I have a headache" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("Try resting.")))
        .expect(1)
        .mount(&server)
        .await;

    let llm = OpenAICompatibleLlm::groq(config_for(&server, Some("gsk-test"))).unwrap();
    let response = llm
        .generate(
            &[Message::system("be brief"), Message::user("I have a headache")],
            Some(GenerationOptions::with_model("llama-3.3-70b-versatile")),
        )
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("Try resting."));
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

#[tokio::test]
async fn test_groq_image_payload_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "meta-llama/llama-4-scout-17b-16e-instruct",
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": "look" },
                    { "type": "image_url", "image_url": { "url": "data:image/jpeg;base64,AAAA" } }
                ]
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_completion("No fractures detected.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let llm = OpenAICompatibleLlm::groq(config_for(&server, Some("gsk-test"))).unwrap();
    let message = Message::user(vec![
        ContentPart::text("look"),
        ContentPart::image_url("data:image/jpeg;base64,AAAA"),
    ]);
    let response = llm
        .generate(
            &[message],
            Some(GenerationOptions::with_model(
                "meta-llama/llama-4-scout-17b-16e-instruct",
            )),
        )
        .await
        .unwrap();

    assert_eq!(response.content.as_deref(), Some("No fractures detected."));
}

#[tokio::test]
async fn test_groq_error_message_passed_through() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Invalid API Key",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let llm = OpenAICompatibleLlm::groq(config_for(&server, Some("bad-key"))).unwrap();
    let err = llm.generate(&[Message::user("hi")], None).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::AuthInvalidKey);
    assert_eq!(
        err.to_string(),
        "Authentication error: Groq API error (401): Invalid API Key"
    );
}

#[tokio::test]
async fn test_groq_non_json_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let llm = OpenAICompatibleLlm::groq(config_for(&server, Some("gsk-test"))).unwrap();
    let err = llm.generate(&[Message::user("hi")], None).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "LLM error: Groq API error (503): upstream unavailable"
    );
}

#[tokio::test]
async fn test_groq_malformed_success_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let llm = OpenAICompatibleLlm::groq(config_for(&server, Some("gsk-test"))).unwrap();
    let err = llm.generate(&[Message::user("hi")], None).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::LlmInvalidResponse);
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let llm = OpenAICompatibleLlm::groq(LlmConfig {
        api_key: Some("   ".to_string()),
        base_url: Some(server.uri()),
        ..Default::default()
    })
    .unwrap();
    assert!(!llm.is_configured());

    let err = llm.generate(&[Message::user("hi")], None).await.unwrap_err();
    assert!(matches!(err, DrCareError::Authentication { .. }));
    assert_eq!(err.code(), ErrorCode::AuthMissingCredentials);
}

#[tokio::test]
async fn test_anthropic_system_and_image_mapping() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "sk-ant"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20240620",
            "system": "be brief",
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": "look" },
                    {
                        "type": "image",
                        "source": { "type": "base64", "media_type": "image/jpeg", "data": "AAAA" }
                    }
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20240620",
            "content": [{ "type": "text", "text": "Clear lungs." }],
            "usage": { "input_tokens": 20, "output_tokens": 4 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let llm = AnthropicLlm::new(config_for(&server, Some("sk-ant"))).unwrap();
    let messages = [
        Message::system("be brief"),
        Message::user(vec![
            ContentPart::text("look"),
            ContentPart::image_url("data:image/jpeg;base64,AAAA"),
        ]),
    ];
    let response = llm.generate(&messages, None).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("Clear lungs."));
    assert_eq!(response.usage.unwrap().total_tokens, 24);
}

#[tokio::test]
async fn test_anthropic_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "type": "error",
            "error": { "type": "rate_limit_error", "message": "Too many requests" }
        })))
        .mount(&server)
        .await;

    let llm = AnthropicLlm::new(config_for(&server, Some("sk-ant"))).unwrap();
    let err = llm.generate(&[Message::user("hi")], None).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::RateLimitExceeded);
    assert!(err.to_string().contains("Too many requests"));
}

#[tokio::test]
async fn test_anthropic_consultation_requests_claude_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(json!({ "model": "claude-3-5-sonnet-20240620" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_2",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20240620",
            "content": [{ "type": "text", "text": "Drink water." }],
            "usage": { "input_tokens": 30, "output_tokens": 3 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DrCareConfig::default();
    config.llm.provider = LlmProvider::Anthropic;
    config.llm.config = config_for(&server, Some("sk-ant"));

    let handler = ConsultationHandler::new(
        Arc::new(ContextStore::new()),
        LlmFactory::from_config(&config.llm).unwrap(),
        config.consultation_models(),
    );
    let reply = handler.consult("alice", "hi").await;

    assert_eq!(reply, "Drink water.");
}

#[tokio::test]
async fn test_openai_image_analysis_uses_configured_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("Looks normal.")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DrCareConfig::default();
    config.llm.provider = LlmProvider::OpenAI;
    config.llm.config = LlmConfig {
        model: "gpt-4o".to_string(),
        ..config_for(&server, Some("sk-test"))
    };

    let handler = ConsultationHandler::new(
        Arc::new(ContextStore::new()),
        LlmFactory::from_config(&config.llm).unwrap(),
        config.consultation_models(),
    );
    let analysis = handler.analyze_image("bob", "scan.jpg", b"jpeg").await;

    assert_eq!(analysis, "Looks normal.");
}
