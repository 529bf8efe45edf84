//! Provider error types

use thiserror::Error;

/// Errors that can occur while streaming a recommendation
///
/// None of these are retried automatically - a transport or provider
/// failure is surfaced once and the user decides whether to resubmit.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API key missing: set the {0} environment variable")]
    MissingApiKey(String),
}
