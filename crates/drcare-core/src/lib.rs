//! drcare-core - Core library for drcare.
//!
//! This crate provides the core types, traits, per-user context store and
//! consultation handler for the Dr.Care relay.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use drcare_core::{ConsultationHandler, ConsultationModels, ContextStore};
//!
//! let store = Arc::new(ContextStore::new());
//! let handler = ConsultationHandler::new(store, llm, ConsultationModels::default());
//!
//! // Ask a question; failures come back as "Error: ..."
//! let reply = handler.consult("alice", "What medicine should I take?").await;
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{
    ConsultationModels, DrCareConfig, LlmProvider, LlmProviderConfig, MemoryLimits, ModelSelection,
};
pub use error::{DrCareError, DrCareResult, ErrorCode};
pub use memory::{
    BoundedGrowth, ConsultationHandler, ContextStore, GrowthPolicy, MemoryHandle, MemoryRecord,
    Unbounded,
};
pub use traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
pub use types::{ContentPart, ImageUrl, Message, MessageContent, MessageRole};
