//! OCR collaborator seam: given a document file, return the semi-structured
//! field mapping the vision model read out of it, or fail.

mod anthropic;
mod prompts;

pub use anthropic::AnthropicVisionExtractor;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::anthropic::AnthropicError;
use crate::documents::DocumentKind;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported file format '{extension}' (supported: jpg, jpeg, png, gif, webp, bmp, pdf)")]
    UnsupportedFormat { extension: String },
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Api(#[from] AnthropicError),
    #[error("no JSON object found in the model reply")]
    MalformedReply,
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, kind: DocumentKind, path: &Path) -> Result<Value, ExtractionError>;
}

/// Media type inferred from the file extension; rejects anything the vision
/// API cannot ingest.
pub(crate) fn media_type(path: &Path) -> Result<&'static str, ExtractionError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        "bmp" => Ok("image/bmp"),
        "pdf" => Ok("application/pdf"),
        _ => Err(ExtractionError::UnsupportedFormat { extension }),
    }
}
