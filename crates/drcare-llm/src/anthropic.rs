//! Anthropic (Claude) LLM provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use drcare_core::config::LlmProvider;
use drcare_core::error::{DrCareError, DrCareResult};
use drcare_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use drcare_core::types::{ContentPart, Message, MessageContent, MessageRole};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Anthropic LLM provider.
pub struct AnthropicLlm {
    client: Client,
    config: LlmConfig,
    api_key: Option<SecretString>,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<AnthropicBlock>),
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum AnthropicBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ImageSource {
    Base64 { media_type: String, data: String },
    Url { url: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponseBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Split a `data:<media type>;base64,<data>` URI.
fn parse_data_uri(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (media_type, data) = rest.split_once(";base64,")?;
    Some((media_type, data))
}

fn to_block(part: &ContentPart) -> AnthropicBlock {
    match part {
        ContentPart::Text { text } => AnthropicBlock::Text { text: text.clone() },
        ContentPart::ImageUrl { image_url } => {
            let source = match parse_data_uri(&image_url.url) {
                Some((media_type, data)) => ImageSource::Base64 {
                    media_type: media_type.to_string(),
                    data: data.to_string(),
                },
                None => ImageSource::Url {
                    url: image_url.url.clone(),
                },
            };
            AnthropicBlock::Image { source }
        }
    }
}

fn to_content(content: &MessageContent) -> AnthropicContent {
    match content {
        MessageContent::Text(text) => AnthropicContent::Text(text.clone()),
        MessageContent::Parts(parts) => {
            AnthropicContent::Blocks(parts.iter().map(to_block).collect())
        }
    }
}

impl AnthropicLlm {
    /// Create a new Anthropic LLM provider.
    pub fn new(config: LlmConfig) -> DrCareResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(LlmProvider::Anthropic.api_key_env()).ok())
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                DrCareError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| DrCareError::Configuration(format!("Invalid Anthropic URL: {}", e)))?;

        let mut config = config;
        if config.model.is_empty() {
            config.model = LlmProvider::Anthropic.default_text_model().to_string();
        }

        Ok(Self {
            client,
            config,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Llm for AnthropicLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> DrCareResult<LlmResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            DrCareError::missing_credentials("Anthropic", LlmProvider::Anthropic.api_key_env())
        })?;

        let options = options.unwrap_or_default();

        // System messages go in their own field
        let system: Vec<String> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.text())
            .collect();

        let conversation: Vec<AnthropicMessage> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: to_content(&m.content),
            })
            .collect();

        let request = AnthropicRequest {
            model: options
                .model
                .unwrap_or_else(|| self.config.model.clone()),
            max_tokens: options
                .max_tokens
                .or(self.config.max_tokens)
                .unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature.or(self.config.temperature),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: conversation,
        };

        debug!(provider = "Anthropic", model = %request.model, "Sending messages request");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                DrCareError::network(
                    format!("Anthropic API request failed: {}", e),
                    e.is_timeout(),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            DrCareError::network(format!("Failed to read response body: {}", e), e.is_timeout())
        })?;

        if !status.is_success() {
            let error: Result<AnthropicError, _> = serde_json::from_str(&body);
            let message = error.map(|e| e.error.message).unwrap_or(body);
            return Err(DrCareError::from_http_status(
                "Anthropic",
                status.as_u16(),
                &message,
            ));
        }

        let response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| DrCareError::invalid_response(format!("Failed to parse response: {}", e)))?;

        let content = response
            .content
            .into_iter()
            .find(|c| c.content_type == "text")
            .and_then(|c| c.text);

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(LlmResponse {
            content,
            model: response.model,
            usage,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_vision(&self) -> bool {
        self.config.enable_vision
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_uri() {
        assert_eq!(
            parse_data_uri("data:image/jpeg;base64,AAAA"),
            Some(("image/jpeg", "AAAA"))
        );
        assert_eq!(parse_data_uri("https://example.com/x.jpg"), None);
        assert_eq!(parse_data_uri("data:image/jpeg,raw"), None);
    }

    #[test]
    fn test_image_part_becomes_base64_block() {
        let block = to_block(&ContentPart::image_url("data:image/jpeg;base64,AAAA"));
        assert_eq!(
            block,
            AnthropicBlock::Image {
                source: ImageSource::Base64 {
                    media_type: "image/jpeg".to_string(),
                    data: "AAAA".to_string(),
                }
            }
        );

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["source"]["type"], "base64");
        assert_eq!(json["source"]["media_type"], "image/jpeg");
    }

    #[test]
    fn test_remote_image_becomes_url_block() {
        let block = to_block(&ContentPart::image_url("https://example.com/x.jpg"));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["source"]["type"], "url");
        assert_eq!(json["source"]["url"], "https://example.com/x.jpg");
    }

    #[test]
    fn test_default_model() {
        let llm = AnthropicLlm::new(LlmConfig {
            api_key: Some("sk-ant".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(llm.model_name(), "claude-3-5-sonnet-20240620");
        assert!(llm.is_configured());
    }
}
