//! Minimal HTTP client for the Anthropic Messages API.
//!
//! Shared by the vision extraction and validation collaborators. Handles
//! authentication headers, a bounded request timeout, and a single retry on
//! transient errors (429, 500, 503).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, thiserror::Error)]
pub enum AnthropicError {
    #[error("invalid Anthropic client configuration: {0}")]
    Config(String),
    #[error("Anthropic request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Anthropic API error: {0}")]
    Api(String),
    #[error("Anthropic reply carried no text content")]
    EmptyReply,
}

/// A request to the Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ApiMessage>,
}

impl MessageRequest {
    /// Single user turn carrying the given content blocks.
    pub fn user(model: impl Into<String>, max_tokens: u32, content: Vec<ContentBlock>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// A typed content block within a message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: MediaSource },
    Document { source: MediaSource },
}

/// Base64 payload for an image or document block.
#[derive(Debug, Clone, Serialize)]
pub struct MediaSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl MediaSource {
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".to_string(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    type_: String,
    message: String,
}

/// HTTP client for Anthropic API communication.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(api_key: &str, api_version: &str) -> Result<Self, AnthropicError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|err| AnthropicError::Config(format!("invalid API key header: {err}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|err| {
                AnthropicError::Config(format!("invalid API version header: {err}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| AnthropicError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            max_retries: 1,
        })
    }

    /// Sends a non-streaming request and returns the concatenated text
    /// content of the reply.
    pub async fn complete(&self, request: &MessageRequest) -> Result<String, AnthropicError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying Anthropic request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(request)
                .send()
                .await?;

            let status = response.status();
            debug!(status = %status, attempt, "Anthropic response received");

            if status.is_success() {
                let parsed: MessageResponse = response.json().await?;
                let text: String = parsed
                    .content
                    .into_iter()
                    .filter(|block| block.kind == "text")
                    .filter_map(|block| block.text)
                    .collect();
                if text.is_empty() {
                    return Err(AnthropicError::EmptyReply);
                }
                return Ok(text);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(AnthropicError::Api(format!("API returned {status}: {body}")));
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("{}: {}", api_err.error.type_, api_err.error.message),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(AnthropicError::Api(message));
        }

        Err(last_error
            .unwrap_or_else(|| AnthropicError::Api("request failed after retries".to_string())))
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

/// Extracts the first brace-delimited object from a model reply that may be
/// wrapped in prose or code fences.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_found_inside_wrapping_text() {
        let reply = "Voici le résultat demandé :\n```json\n{\"ok\": true}\n```\nBonne journée.";
        assert_eq!(extract_json_object(reply), Some("{\"ok\": true}"));
    }

    #[test]
    fn json_object_absent_yields_none() {
        assert_eq!(extract_json_object("pas de json ici"), None);
        assert_eq!(extract_json_object("}{"), None);
    }

    #[test]
    fn user_request_wraps_blocks_in_a_single_turn() {
        let request = MessageRequest::user(
            "claude-sonnet-4-20250514",
            1024,
            vec![ContentBlock::Text {
                text: "bonjour".to_string(),
            }],
        );
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        let encoded = serde_json::to_value(&request).expect("serializes");
        assert_eq!(encoded["messages"][0]["content"][0]["type"], "text");
    }
}
