//! LLM integration for the triage core.
//!
//! Supports:
//! - **Anthropic**: messages API
//! - **OpenAI**: chat-completions API (and compatible endpoints)
//!
//! Both providers implement the [`LlmProvider`] trait; the classifier only
//! ever sees the trait object.

mod anthropic;
mod costs;
mod openai;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    match config.backend {
        LlmBackend::Anthropic => {
            tracing::info!("Using Anthropic (model: {})", config.model);
            Arc::new(AnthropicProvider::new(
                config.api_key.clone(),
                config.model.clone(),
            ))
        }
        LlmBackend::OpenAi => {
            tracing::info!("Using OpenAI (model: {})", config.model);
            Arc::new(OpenAiProvider::new(
                config.api_key.clone(),
                config.model.clone(),
            ))
        }
    }
}
