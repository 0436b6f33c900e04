//! Server state management.

use std::sync::Arc;

use drcare_core::config::DrCareConfig;
use drcare_core::error::DrCareResult;
use drcare_core::memory::ConsultationHandler;

use crate::factory::create_handler;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ConsultationHandler>,
    pub config: Arc<DrCareConfig>,
}

impl AppState {
    /// Create state around an existing handler.
    pub fn new(handler: ConsultationHandler, config: DrCareConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config: Arc::new(config),
        }
    }

    /// Build the handler and its store from configuration.
    pub fn from_config(config: DrCareConfig) -> DrCareResult<Self> {
        let handler = create_handler(&config)?;
        Ok(Self::new(handler, config))
    }

    /// Whether the inference provider has credentials.
    pub fn is_llm_configured(&self) -> bool {
        self.handler.llm().is_configured()
    }
}
