//! The staged contestation pipeline.
//!
//! One execution per task, detached from the request that created it: every
//! failure, anticipated or not, ends as a FAILED transition on the record
//! rather than an escaped error.

use std::sync::Arc;

use chrono::Local;
use tracing::{error, info};

use super::extraction::DocumentExtractor;
use super::formfill::FormGateway;
use super::letter::LetterRenderer;
use super::photo::DriverVisibilityAnalyzer;
use super::status::TaskStatus;
use super::store::{TaskId, TaskStore, TaskUpdate};
use super::validation::{DocumentValidator, ReasoningGateway};
use crate::documents::{DocumentKind, DocumentSet};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("task {0} not found in the store")]
    UnknownTask(TaskId),
    #[error("failed to extract the {kind} document: {message}")]
    Extraction { kind: DocumentKind, message: String },
    #[error("government form submission failed: {0}")]
    Form(String),
    #[error("radar photo analysis failed: {0}")]
    Photo(String),
    #[error("letter rendering failed: {0}")]
    Render(String),
}

/// Drives one task through extraction, validation, form submission, photo
/// analysis, and rendering, persisting every transition via the store.
pub struct ContestationPipeline<S, E, R, F, P> {
    store: Arc<S>,
    extractor: Arc<E>,
    validator: DocumentValidator<R>,
    form: Arc<F>,
    photo: Arc<P>,
    renderer: Arc<LetterRenderer>,
}

impl<S, E, R, F, P> ContestationPipeline<S, E, R, F, P>
where
    S: TaskStore,
    E: DocumentExtractor,
    R: ReasoningGateway,
    F: FormGateway,
    P: DriverVisibilityAnalyzer,
{
    pub fn new(
        store: Arc<S>,
        extractor: Arc<E>,
        validator: DocumentValidator<R>,
        form: Arc<F>,
        photo: Arc<P>,
        renderer: Arc<LetterRenderer>,
    ) -> Self {
        Self {
            store,
            extractor,
            validator,
            form,
            photo,
            renderer,
        }
    }

    /// Entry point for detached execution.
    pub async fn run(&self, id: TaskId) {
        info!(task = %id, "contestation pipeline started");
        if let Err(err) = self.execute(&id).await {
            error!(task = %id, error = %err, "contestation pipeline failed");
            self.store.fail(&id, err.to_string());
        }
    }

    async fn execute(&self, id: &TaskId) -> Result<(), PipelineError> {
        let record = self
            .store
            .get(id)
            .ok_or_else(|| PipelineError::UnknownTask(id.clone()))?;

        // Stage 1: extraction, one sub-stage per supplied document. An
        // absent document contributes nothing and emits no status.
        let mut documents = DocumentSet::default();
        for kind in DocumentKind::ordered() {
            let Some(path) = record.file_paths.get(&kind) else {
                continue;
            };
            self.store.advance(id, TaskStatus::scanning(kind), None);
            let payload = self
                .extractor
                .extract(kind, path)
                .await
                .map_err(|err| PipelineError::Extraction {
                    kind,
                    message: err.to_string(),
                })?;
            documents
                .insert(kind, payload)
                .map_err(|err| PipelineError::Extraction {
                    kind,
                    message: err.to_string(),
                })?;
            self.store.apply(id, TaskUpdate::Documents(documents.clone()));
            info!(task = %id, kind = kind.as_str(), "document extracted");
        }

        // Stage 2: validation always runs, even over an empty set, and is
        // advisory: its failures arrive as an ERROR-status result.
        self.store.advance(id, TaskStatus::Validating, None);
        let today = Local::now().date_naive();
        let validation = self.validator.validate(&documents, today).await;
        info!(task = %id, status = ?validation.status, "validation finished");
        self.store.apply(id, TaskUpdate::Validation(validation));

        // Stage 3: government form submission.
        self.store.advance(id, TaskStatus::FillingForm, None);
        let report = self
            .form
            .submit(&documents)
            .await
            .map_err(|err| PipelineError::Form(err.to_string()))?;
        self.store.apply(id, TaskUpdate::FormReport(report));

        // Stage 4: radar-photo analysis.
        self.store.advance(id, TaskStatus::AnalyzingPhoto, None);
        let driver_visible = self
            .photo
            .driver_visible(&documents)
            .await
            .map_err(|err| PipelineError::Photo(err.to_string()))?;
        self.store
            .apply(id, TaskUpdate::DriverVisible(driver_visible));
        info!(task = %id, driver_visible, "photo analysis finished");

        // Stage 5: letter rendering.
        self.store.advance(id, TaskStatus::GeneratingPdf, None);
        let artifact = self
            .renderer
            .render(&documents, driver_visible, id)
            .await
            .map_err(|err| PipelineError::Render(err.to_string()))?;
        self.store
            .apply(id, TaskUpdate::ResultFile(artifact.clone()));
        info!(task = %id, artifact = %artifact.display(), "letter rendered");

        self.store.advance(id, TaskStatus::Completed, None);
        Ok(())
    }
}
