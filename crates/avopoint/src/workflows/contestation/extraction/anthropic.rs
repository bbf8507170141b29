use std::path::Path;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::Value;
use tracing::debug;

use super::prompts::{extraction_prompt, max_tokens};
use super::{media_type, DocumentExtractor, ExtractionError};
use crate::anthropic::{
    extract_json_object, AnthropicClient, ContentBlock, MediaSource, MessageRequest,
};
use crate::documents::DocumentKind;

/// Production extractor: ships the document inline to the vision model and
/// parses its JSON reply.
#[derive(Debug, Clone)]
pub struct AnthropicVisionExtractor {
    client: AnthropicClient,
    model: String,
}

impl AnthropicVisionExtractor {
    pub fn new(client: AnthropicClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl DocumentExtractor for AnthropicVisionExtractor {
    async fn extract(&self, kind: DocumentKind, path: &Path) -> Result<Value, ExtractionError> {
        let media = media_type(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let source = MediaSource::base64(media, encoded);

        // PDFs travel as document blocks, everything else as image blocks.
        let media_block = if media == "application/pdf" {
            ContentBlock::Document { source }
        } else {
            ContentBlock::Image { source }
        };

        let request = MessageRequest::user(
            self.model.clone(),
            max_tokens(kind),
            vec![
                media_block,
                ContentBlock::Text {
                    text: extraction_prompt(kind).to_string(),
                },
            ],
        );

        let reply = self.client.complete(&request).await?;
        debug!(kind = kind.as_str(), reply_len = reply.len(), "extraction reply received");

        let object = extract_json_object(&reply).ok_or(ExtractionError::MalformedReply)?;
        serde_json::from_str(object).map_err(|_| ExtractionError::MalformedReply)
    }
}
