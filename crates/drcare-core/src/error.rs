//! Error types for drcare operations.
//!
//! Every failure inside a consultation is eventually rendered as text for the
//! caller, so each variant carries a human-readable message and a stable
//! error code for logs.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for drcare operations.
pub type DrCareResult<T> = Result<T, DrCareError>;

/// Main error type for all drcare operations.
#[derive(Error, Debug)]
pub enum DrCareError {
    /// Authentication with the inference provider failed.
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// Quota exceeded.
    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String, code: ErrorCode },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The uploaded payload could not be read.
    #[error("Upload error: {message}")]
    Upload { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (AUTH_xxx)
    AuthInvalidKey,
    AuthMissingCredentials,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // Quota (QTA_xxx)
    QtaExceeded,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Upload (UPL_xxx)
    UplUnreadable,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::AuthMissingCredentials => "AUTH_003",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::QtaExceeded => "QTA_001",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::UplUnreadable => "UPL_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl DrCareError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for a missing field.
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.clone());
        Self::Validation {
            message: format!("Missing required field '{}'", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: Some(format!("Provide the '{}' field", field)),
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM error for a response that could not be interpreted.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmInvalidResponse,
            source: None,
        }
    }

    /// Create a network error from a transport failure.
    pub fn network(message: impl Into<String>, timed_out: bool) -> Self {
        Self::Network {
            message: message.into(),
            code: if timed_out {
                ErrorCode::NetTimeout
            } else {
                ErrorCode::NetConnectionFailed
            },
            source: None,
        }
    }

    /// Create an upload error.
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
            code: ErrorCode::UplUnreadable,
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: ErrorCode::AuthInvalidKey,
            source: None,
        }
    }

    /// Create an error for a provider that has no API key configured.
    pub fn missing_credentials(provider: &str, env_var: &str) -> Self {
        Self::Authentication {
            message: format!(
                "{} API key not found. Set {} environment variable or provide api_key in config.",
                provider, env_var
            ),
            code: ErrorCode::AuthMissingCredentials,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::QuotaExceeded { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Upload { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Authentication { .. } => {
                Some("Please check your API key and authentication credentials")
            }
            Self::RateLimit { .. } => Some("Please wait before making more requests"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            Self::Upload { .. } => Some("Please re-send the file as a multipart upload"),
            _ => None,
        }
    }

    /// Convert an upstream HTTP failure into an error.
    ///
    /// `message` is the provider's own error text when one could be decoded,
    /// otherwise the raw body.
    pub fn from_http_status(provider: &str, status: u16, message: &str) -> Self {
        let message = format!("{} API error ({}): {}", provider, status, message);
        match status {
            400 => Self::Validation {
                message,
                code: ErrorCode::ValInvalidInput,
                details: HashMap::new(),
                suggestion: Some("Please check your request parameters".to_string()),
            },
            401 | 403 => Self::Authentication {
                message,
                code: ErrorCode::AuthInvalidKey,
                source: None,
            },
            402 => Self::QuotaExceeded {
                message,
                code: ErrorCode::QtaExceeded,
            },
            429 => Self::RateLimit {
                message,
                code: ErrorCode::RateLimitExceeded,
                retry_after: None,
            },
            _ => Self::llm(message),
        }
    }
}
