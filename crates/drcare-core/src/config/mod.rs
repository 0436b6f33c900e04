//! Configuration system for drcare.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString};

use crate::error::{DrCareError, DrCareResult};
use crate::traits::LlmConfig;

/// Default model for text consultations on Groq.
pub const DEFAULT_TEXT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default model for image analysis on Groq.
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Default upload limit for the image flow (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// LLM provider type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProvider {
    #[default]
    Groq,
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Model used when neither the provider config nor `[models]` names one.
    pub fn default_text_model(&self) -> &'static str {
        match self {
            LlmProvider::Groq => DEFAULT_TEXT_MODEL,
            LlmProvider::OpenAI => DEFAULT_OPENAI_MODEL,
            LlmProvider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }

    /// Image-capable model for providers whose text models reject images.
    /// `None` means the text model handles images too.
    pub fn dedicated_vision_model(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Groq => Some(DEFAULT_VISION_MODEL),
            LlmProvider::OpenAI | LlmProvider::Anthropic => None,
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

/// Per-flow model overrides from the `[models]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
}

/// Models requested by the two consultation flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultationModels {
    pub text_model: String,
    pub vision_model: String,
}

impl Default for ConsultationModels {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, which bounds image uploads.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Size limits for per-user memory. Unset limits mean unbounded growth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_context_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history_entries: Option<usize>,
}

impl MemoryLimits {
    /// Whether any limit is set.
    pub fn is_bounded(&self) -> bool {
        self.max_context_bytes.is_some() || self.max_history_entries.is_some()
    }
}

/// Main drcare configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrCareConfig {
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Model overrides for text and image consultations.
    pub models: ModelSelection,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Memory growth limits.
    pub memory: MemoryLimits,
}

impl DrCareConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> DrCareResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| DrCareError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| DrCareError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| DrCareError::Configuration(e.to_string())),
            _ => Err(DrCareError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> DrCareResult<Self> {
        Self::default().with_env()
    }

    /// Load the file named by `DRCARE_CONFIG` (if set), then apply the
    /// environment on top.
    pub fn load() -> DrCareResult<Self> {
        match std::env::var("DRCARE_CONFIG") {
            Ok(path) => Self::from_file(path)?.with_env(),
            Err(_) => Self::from_env(),
        }
    }

    /// Resolve the models each flow requests.
    ///
    /// Explicit `[models]` entries win, then `llm.model`, then the provider's
    /// defaults.
    pub fn consultation_models(&self) -> ConsultationModels {
        let provider = self.llm.provider;
        let text_model = self
            .models
            .text_model
            .clone()
            .or_else(|| {
                let model = self.llm.config.model.trim();
                (!model.is_empty()).then(|| model.to_string())
            })
            .unwrap_or_else(|| provider.default_text_model().to_string());
        let vision_model = self.models.vision_model.clone().unwrap_or_else(|| {
            provider
                .dedicated_vision_model()
                .map(str::to_string)
                .unwrap_or_else(|| text_model.clone())
        });

        ConsultationModels {
            text_model,
            vision_model,
        }
    }

    /// Overlay process environment variables.
    pub fn with_env(self) -> DrCareResult<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from an arbitrary lookup.
    pub fn with_vars<F>(mut self, var: F) -> DrCareResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Provider first, since it decides which key variable applies
        if let Some(provider) = var("DRCARE_LLM_PROVIDER") {
            self.llm.provider = provider.parse().map_err(|_| {
                DrCareError::Configuration(format!("Unknown LLM provider: {}", provider))
            })?;
        }
        if self.llm.config.api_key.is_none() {
            self.llm.config.api_key = var(self.llm.provider.api_key_env());
        }
        if let Some(base_url) = var("DRCARE_LLM_BASE_URL") {
            self.llm.config.base_url = Some(base_url);
        }

        if let Some(model) = var("DRCARE_TEXT_MODEL") {
            self.models.text_model = Some(model);
        }
        if let Some(model) = var("DRCARE_VISION_MODEL") {
            self.models.vision_model = Some(model);
        }

        if let Some(host) = var("DRCARE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("DRCARE_PORT") {
            self.server.port = parse_var("DRCARE_PORT", &port)?;
        }
        if let Some(limit) = var("DRCARE_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse_var("DRCARE_MAX_UPLOAD_BYTES", &limit)?;
        }

        if let Some(limit) = var("DRCARE_MAX_CONTEXT_BYTES") {
            self.memory.max_context_bytes = Some(parse_var("DRCARE_MAX_CONTEXT_BYTES", &limit)?);
        }
        if let Some(limit) = var("DRCARE_MAX_HISTORY_ENTRIES") {
            self.memory.max_history_entries =
                Some(parse_var("DRCARE_MAX_HISTORY_ENTRIES", &limit)?);
        }

        Ok(self)
    }

}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> DrCareResult<T> {
    value.trim().parse().map_err(|_| {
        DrCareError::Configuration(format!("{} has an invalid value: {}", name, value))
    })
}
