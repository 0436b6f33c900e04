//! drcare-llm - Inference provider implementations for drcare.
//!
//! # Supported Providers
//!
//! - **Groq** (default) - OpenAI-compatible endpoint hosting Llama models
//! - **OpenAI** - same client, different base URL
//! - **Anthropic** - Claude via the Messages API
//!
//! # Example
//!
//! ```ignore
//! use drcare_llm::LlmFactory;
//!
//! // Groq with GROQ_API_KEY from the environment
//! let llm = LlmFactory::groq()?;
//!
//! // Or from a loaded config
//! let llm = LlmFactory::from_config(&config.llm)?;
//! ```

mod anthropic;
mod factory;
mod openai_compat;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use openai_compat::OpenAICompatibleLlm;

// Re-export core types for convenience
pub use drcare_core::config::LlmProvider;
pub use drcare_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse};
