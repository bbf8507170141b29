//! Disk ownership of a task's files: one upload directory per task, one
//! rendered artifact, both released in bulk on deletion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::store::{TaskId, TaskRecord};
use crate::documents::DocumentKind;

/// One uploaded part, decoded from the multipart request.
#[derive(Debug, Clone)]
pub struct IncomingDocument {
    pub kind: DocumentKind,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Persists uploads under `<upload_dir>/<task_id>/` and cleans up after
/// deleted tasks.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    upload_dir: PathBuf,
}

impl UploadStorage {
    pub fn new(upload_dir: PathBuf) -> Self {
        Self { upload_dir }
    }

    pub async fn persist(
        &self,
        task_id: &TaskId,
        documents: &[IncomingDocument],
    ) -> Result<BTreeMap<DocumentKind, PathBuf>, std::io::Error> {
        let task_dir = self.upload_dir.join(task_id.to_string());
        tokio::fs::create_dir_all(&task_dir).await?;

        let mut paths = BTreeMap::new();
        for document in documents {
            let filename = sanitize_filename(&document.filename);
            let path = task_dir.join(format!("{}_{}", document.kind, filename));
            tokio::fs::write(&path, &document.bytes).await?;
            info!(task = %task_id, kind = document.kind.as_str(), path = %path.display(), "stored uploaded document");
            paths.insert(document.kind, path);
        }
        Ok(paths)
    }

    /// Best effort: a vanished file must not block deletion of the record.
    pub async fn release(&self, record: &TaskRecord) {
        let task_dir = self.upload_dir.join(record.id.to_string());
        if let Err(err) = tokio::fs::remove_dir_all(&task_dir).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(task = %record.id, error = %err, "failed to remove upload directory");
            }
        }

        if let Some(result_file) = &record.result_file {
            if let Err(err) = tokio::fs::remove_file(result_file).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(task = %record.id, error = %err, "failed to remove result file");
                }
            }
        }
        info!(task = %record.id, "released stored files");
    }
}

/// Keeps the client-supplied name but strips anything path-like.
fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == ' ').to_string();
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed
    }
}
