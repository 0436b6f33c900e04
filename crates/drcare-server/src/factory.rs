//! Factory for creating the consultation handler from configuration.

use std::sync::Arc;

use drcare_core::config::DrCareConfig;
use drcare_core::error::DrCareResult;
use drcare_core::memory::{ConsultationHandler, ContextStore};
use drcare_llm::LlmFactory;
use tracing::info;

/// Create a consultation handler from configuration.
pub fn create_handler(config: &DrCareConfig) -> DrCareResult<ConsultationHandler> {
    let llm = LlmFactory::from_config(&config.llm)?;
    let store = Arc::new(ContextStore::from_limits(&config.memory));
    let handler = ConsultationHandler::new(store, llm, config.consultation_models());

    info!(
        provider = %config.llm.provider,
        text_model = %handler.models().text_model,
        vision_model = %handler.models().vision_model,
        growth_policy = handler.store().policy_name(),
        "Consultation handler ready"
    );

    Ok(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drcare_core::config::LlmProvider;

    #[test]
    fn test_handler_models_follow_provider() {
        let mut config = DrCareConfig::default();
        config.llm.provider = LlmProvider::Anthropic;
        config.llm.config.api_key = Some("sk-ant".to_string());

        let handler = create_handler(&config).unwrap();
        assert_eq!(handler.models().text_model, "claude-3-5-sonnet-20240620");
        assert_eq!(handler.models().vision_model, "claude-3-5-sonnet-20240620");
        assert_eq!(handler.llm().model_name(), "claude-3-5-sonnet-20240620");
    }
}
