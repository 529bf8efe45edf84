//! Gemini API client implementation
//!
//! Implements [`ProviderClient`] against the streamGenerateContent SSE
//! endpoint. One request, one stream, no automatic retries - a failed
//! generation is surfaced once and the user resubmits if they want to.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::{ContentPart, GenerateRequest, ProviderClient, ProviderError, StreamChunk};
use crate::config::ProviderConfig;
use crate::session::CancelToken;

/// Gemini streaming client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl GeminiClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        debug!(model = %config.model, "from_config: called");
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| ProviderError::MissingApiKey(config.api_key_env.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(ProviderError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    /// Build the request body for the generateContent API
    fn build_request_body(&self, request: &GenerateRequest) -> serde_json::Value {
        debug!(%self.model, part_count = %request.parts.len(), "build_request_body: called");
        let parts: Vec<serde_json::Value> = request.parts.iter().map(convert_part).collect();

        serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }],
            },
            "contents": [{
                "role": "user",
                "parts": parts,
            }],
            "safetySettings": request.safety,
            "generationConfig": {
                "maxOutputTokens": request.max_output_tokens,
            },
        })
    }
}

/// Convert a ContentPart to Gemini API format
fn convert_part(part: &ContentPart) -> serde_json::Value {
    match part {
        ContentPart::Text { text } => serde_json::json!({ "text": text }),
        ContentPart::InlineImage { mime_type, data } => serde_json::json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": data,
            },
        }),
    }
}

/// Pull the text fragments out of one streamed response event
fn extract_text(data: &serde_json::Value) -> Option<String> {
    let parts = data["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() { None } else { Some(text) }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    async fn stream(
        &self,
        request: GenerateRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
        cancel: CancelToken,
    ) -> Result<(), ProviderError> {
        debug!(%self.model, "stream: called");
        let body = self.build_request_body(&request);

        let http_request = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", self.api_key.clone())
            .header("content-type", "application/json")
            .json(&body);

        let mut es = match EventSource::new(http_request) {
            Ok(es) => es,
            Err(e) => {
                debug!(error = %e, "stream: EventSource creation failed");
                let message = e.to_string();
                let _ = chunk_tx.send(StreamChunk::Error(message.clone())).await;
                return Err(ProviderError::InvalidResponse(message));
            }
        };

        while let Some(event) = es.next().await {
            if cancel.is_cancelled() {
                debug!("stream: cancelled, going silent");
                es.close();
                return Ok(());
            }

            match event {
                Ok(Event::Open) => {
                    debug!("stream: Event::Open");
                }
                Ok(Event::Message(msg)) => {
                    let data: serde_json::Value = match serde_json::from_str(&msg.data) {
                        Ok(data) => data,
                        Err(e) => {
                            debug!(error = %e, "stream: malformed event payload");
                            es.close();
                            let message = format!("malformed stream payload: {e}");
                            let _ = chunk_tx.send(StreamChunk::Error(message.clone())).await;
                            return Err(ProviderError::InvalidResponse(message));
                        }
                    };

                    // A response with no candidates carries the block reason
                    if let Some(reason) = data["promptFeedback"]["blockReason"].as_str() {
                        debug!(%reason, "stream: prompt blocked");
                        es.close();
                        let message = format!("request blocked by provider: {reason}");
                        let _ = chunk_tx.send(StreamChunk::Error(message.clone())).await;
                        return Err(ProviderError::InvalidResponse(message));
                    }

                    if let Some(text) = extract_text(&data) {
                        debug!(len = text.len(), "stream: text fragment");
                        let _ = chunk_tx.send(StreamChunk::TextDelta(text)).await;
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("stream: ended normally");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "stream: transport error");
                    es.close();
                    let message = e.to_string();
                    let _ = chunk_tx.send(StreamChunk::Error(message.clone())).await;
                    return Err(ProviderError::InvalidResponse(message));
                }
            }
        }

        if cancel.is_cancelled() {
            debug!("stream: cancelled at end, going silent");
            return Ok(());
        }

        debug!("stream: complete");
        let _ = chunk_tx.send(StreamChunk::Done).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GeminiClient {
        GeminiClient {
            model: "gemini-2.0-flash".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            http: Client::new(),
        }
    }

    #[test]
    fn test_stream_url() {
        let client = test_client();
        assert_eq!(
            client.stream_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_build_request_body_text_only() {
        let client = test_client();
        let request = GenerateRequest::text("You are a culinary assistant", "How much ketchup?", 2048);

        let body = client.build_request_body(&request);

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "You are a culinary assistant"
        );
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "How much ketchup?");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_build_request_body_image_precedes_text() {
        let client = test_client();
        let request = GenerateRequest::text("sys", "What is on this plate?", 2048).with_image("image/jpeg", "QUJD");

        let body = client.build_request_body(&request);
        let parts = body["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert_eq!(parts[1]["text"], "What is on this plate?");
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let data = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "Use a " }, { "text": "golf-ball dollop." }],
                },
            }],
        });

        assert_eq!(extract_text(&data).as_deref(), Some("Use a golf-ball dollop."));
    }

    #[test]
    fn test_extract_text_empty_event() {
        let data = serde_json::json!({ "candidates": [{ "finishReason": "STOP" }] });
        assert_eq!(extract_text(&data), None);
    }
}
