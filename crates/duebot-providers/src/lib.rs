//! # DueBot Providers
//!
//! AI backends for `/ask`. Every OpenAI-compatible API is served by
//! [`OpenAiCompatibleProvider`]; backends differ only by base URL and key.

pub mod openai_compatible;

pub use openai_compatible::OpenAiCompatibleProvider;

use duebot_core::config::AiConfig;
use duebot_core::traits::Provider;

/// Create the `/ask` provider, or `None` when no API key is configured.
pub fn create_provider(config: &AiConfig) -> Option<Box<dyn Provider>> {
    if !config.is_enabled() {
        tracing::info!("No AI key configured; /ask is disabled");
        return None;
    }
    Some(Box::new(OpenAiCompatibleProvider::from_config(config)))
}
