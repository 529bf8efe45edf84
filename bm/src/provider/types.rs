//! Provider request/response types
//!
//! These types model the Gemini generateContent API but stay generic
//! enough that another streaming text provider could implement them.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A generation request - everything needed for one streamed completion
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// System instruction establishing the assistant persona
    pub system_instruction: String,

    /// Ordered content parts; an optional image part precedes the text part
    pub parts: Vec<ContentPart>,

    /// Safety configuration forwarded to the provider
    pub safety: Vec<SafetySetting>,

    /// Max tokens for the response (from config)
    pub max_output_tokens: u32,
}

impl GenerateRequest {
    /// Create a text-only request with the default safety settings
    pub fn text(system_instruction: impl Into<String>, prompt: impl Into<String>, max_output_tokens: u32) -> Self {
        debug!("GenerateRequest::text: called");
        Self {
            system_instruction: system_instruction.into(),
            parts: vec![ContentPart::text(prompt)],
            safety: default_safety_settings(),
            max_output_tokens,
        }
    }

    /// Prepend an inline image part, keeping it ahead of any text part
    pub fn with_image(mut self, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        debug!("GenerateRequest::with_image: called");
        self.parts.insert(
            0,
            ContentPart::InlineImage {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        );
        self
    }
}

/// A content part in a generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain prompt text
    Text { text: String },

    /// Base64 image payload with its mime type
    InlineImage { mime_type: String, data: String },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

/// Safety filter configuration forwarded verbatim to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// The default safety posture: block medium-and-above in every category
pub fn default_safety_settings() -> Vec<SafetySetting> {
    const CATEGORIES: [&str; 4] = [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ];

    CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
        })
        .collect()
}

/// Streaming chunk delivered while a recommendation is being generated
///
/// A well-behaved provider emits zero or more `TextDelta`s followed by
/// exactly one terminal chunk (`Done` or `Error`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Text fragment, delivered in arrival order
    TextDelta(String),

    /// Generation finished normally
    Done,

    /// Generation failed; emitted at most once, then the stream terminates
    Error(String),
}
