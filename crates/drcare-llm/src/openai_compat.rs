//! OpenAI-compatible chat completions provider (Groq, OpenAI).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use drcare_core::config::LlmProvider;
use drcare_core::error::{DrCareError, DrCareResult};
use drcare_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use drcare_core::types::Message;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Chat completions client for any OpenAI-compatible endpoint.
pub struct OpenAICompatibleLlm {
    client: Client,
    config: LlmConfig,
    api_key: Option<SecretString>,
    base_url: String,
    provider_name: &'static str,
    key_env: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ChatErrorDetail {
    message: String,
}

impl OpenAICompatibleLlm {
    /// Create a provider for Groq or OpenAI.
    ///
    /// A missing API key is not an error here; calls fail until one is set.
    pub fn new(provider: LlmProvider, config: LlmConfig) -> DrCareResult<Self> {
        let (provider_name, default_url) = match provider {
            LlmProvider::Groq => ("Groq", GROQ_API_URL),
            LlmProvider::OpenAI => ("OpenAI", OPENAI_API_URL),
            other => {
                return Err(DrCareError::UnsupportedProvider {
                    provider: format!("{} is not OpenAI-compatible", other),
                })
            }
        };
        let key_env = provider.api_key_env();

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(key_env).ok())
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new);

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_url.to_string());
        url::Url::parse(&base_url)
            .map_err(|e| DrCareError::Configuration(format!("Invalid {} URL: {}", provider_name, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                DrCareError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let mut config = config;
        if config.model.is_empty() {
            config.model = provider.default_text_model().to_string();
        }

        Ok(Self {
            client,
            config,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider_name,
            key_env,
        })
    }

    /// Create a Groq provider.
    pub fn groq(config: LlmConfig) -> DrCareResult<Self> {
        Self::new(LlmProvider::Groq, config)
    }

    /// Create an OpenAI provider.
    pub fn openai(config: LlmConfig) -> DrCareResult<Self> {
        Self::new(LlmProvider::OpenAI, config)
    }
}

#[async_trait]
impl Llm for OpenAICompatibleLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> DrCareResult<LlmResponse> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| DrCareError::missing_credentials(self.provider_name, self.key_env))?;

        if !self.config.enable_vision && messages.iter().any(|m| m.content.has_image()) {
            return Err(DrCareError::validation(format!(
                "Image input is disabled for the {} provider",
                self.provider_name
            )));
        }

        let options = options.unwrap_or_default();
        let model = options.model.as_deref().unwrap_or(&self.config.model);

        let request = ChatRequest {
            model,
            messages,
            temperature: options.temperature.or(self.config.temperature),
            max_tokens: options.max_tokens.or(self.config.max_tokens),
        };

        debug!(provider = self.provider_name, model = %model, messages = messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                DrCareError::network(
                    format!("{} API request failed: {}", self.provider_name, e),
                    e.is_timeout(),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            DrCareError::network(format!("Failed to read response body: {}", e), e.is_timeout())
        })?;

        if !status.is_success() {
            let error: Result<ChatError, _> = serde_json::from_str(&body);
            let message = error.map(|e| e.error.message).unwrap_or(body);
            return Err(DrCareError::from_http_status(
                self.provider_name,
                status.as_u16(),
                &message,
            ));
        }

        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| DrCareError::invalid_response(format!("Failed to parse response: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DrCareError::invalid_response("No response choices returned"))?
            .message
            .content;

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
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
