//! Factory for creating LLM providers.

use std::sync::Arc;

use tracing::warn;

use drcare_core::config::{LlmProvider, LlmProviderConfig};
use drcare_core::error::DrCareResult;
use drcare_core::traits::{Llm, LlmConfig};

use crate::anthropic::AnthropicLlm;
use crate::openai_compat::OpenAICompatibleLlm;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    ///
    /// A provider without an API key is still returned; its calls fail with
    /// an authentication error, so the server can start without one.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> DrCareResult<Arc<dyn Llm>> {
        let llm: Arc<dyn Llm> = match provider {
            LlmProvider::Groq | LlmProvider::OpenAI => {
                Arc::new(OpenAICompatibleLlm::new(provider, config)?)
            }
            LlmProvider::Anthropic => Arc::new(AnthropicLlm::new(config)?),
        };

        if !llm.is_configured() {
            warn!(
                provider = %provider,
                env = provider.api_key_env(),
                "API key not found; consultations will fail until it is set"
            );
        }

        Ok(llm)
    }

    /// Create an LLM provider from a provider section of the config.
    pub fn from_config(config: &LlmProviderConfig) -> DrCareResult<Arc<dyn Llm>> {
        Self::create(config.provider, config.config.clone())
    }

    /// Create a Groq LLM provider with default configuration.
    pub fn groq() -> DrCareResult<Arc<dyn Llm>> {
        Self::create(LlmProvider::Groq, LlmConfig::default())
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> DrCareResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::OpenAI, config)
    }

    /// Create an Anthropic LLM provider with a specific model.
    pub fn anthropic_with_model(model: impl Into<String>) -> DrCareResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Anthropic, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_each_provider() {
        let config = LlmProviderConfig {
            provider: LlmProvider::Groq,
            config: LlmConfig {
                api_key: Some("key".to_string()),
                ..Default::default()
            },
        };
        let llm = LlmFactory::from_config(&config).unwrap();
        assert_eq!(llm.model_name(), "llama-3.3-70b-versatile");

        let llm = LlmFactory::openai_with_model("gpt-4o").unwrap();
        assert_eq!(llm.model_name(), "gpt-4o");

        let llm = LlmFactory::anthropic_with_model("claude-3-haiku-20240307").unwrap();
        assert_eq!(llm.model_name(), "claude-3-haiku-20240307");
    }
}
