//! AI provider module for BiteMatch
//!
//! The recommendation text comes from an external generative model,
//! consumed as an opaque streaming text generator behind [`ProviderClient`].

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod types;

pub use client::ProviderClient;
pub use error::ProviderError;
pub use gemini::GeminiClient;
pub use types::{ContentPart, GenerateRequest, SafetySetting, StreamChunk, default_safety_settings};

use crate::config::ProviderConfig;

/// Create a provider client based on the provider name in config
///
/// Currently only "gemini" is supported; the factory exists so another
/// provider can be slotted in without touching call sites.
pub fn create_client(config: &ProviderConfig) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gemini" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(ProviderError::InvalidResponse(format!(
                "Unknown AI provider: '{}'. Supported: gemini",
                other
            )))
        }
    }
}
