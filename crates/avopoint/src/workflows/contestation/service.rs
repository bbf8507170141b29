use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::extraction::DocumentExtractor;
use super::formfill::FormGateway;
use super::photo::DriverVisibilityAnalyzer;
use super::pipeline::ContestationPipeline;
use super::status::TaskStatus;
use super::storage::{IncomingDocument, UploadStorage};
use super::store::{StoreError, TaskId, TaskRecord, TaskStore, TaskSummary};
use super::validation::ReasoningGateway;

/// Service facade composing the store, the file storage, and the pipeline.
///
/// Submission is accepted synchronously; the pipeline itself runs detached,
/// keyed by the returned task id.
pub struct ContestationService<S, E, R, F, P> {
    store: Arc<S>,
    storage: UploadStorage,
    pipeline: Arc<ContestationPipeline<S, E, R, F, P>>,
}

/// A completed task's artifact, ready to stream back to the client.
#[derive(Debug, Clone)]
pub struct ContestationArtifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unable to persist uploaded documents: {0}")]
    Storage(#[from] std::io::Error),
    #[error("task not finished yet, current status {current:?}")]
    NotCompleted { current: TaskStatus },
    #[error("result file missing from storage")]
    MissingArtifact,
}

impl<S, E, R, F, P> ContestationService<S, E, R, F, P>
where
    S: TaskStore + 'static,
    E: DocumentExtractor + 'static,
    R: ReasoningGateway + 'static,
    F: FormGateway + 'static,
    P: DriverVisibilityAnalyzer + 'static,
{
    pub fn new(
        store: Arc<S>,
        storage: UploadStorage,
        pipeline: Arc<ContestationPipeline<S, E, R, F, P>>,
    ) -> Self {
        Self {
            store,
            storage,
            pipeline,
        }
    }

    /// Persists the uploads, creates the task record, and schedules the
    /// detached pipeline execution.
    pub async fn submit(
        &self,
        documents: Vec<IncomingDocument>,
    ) -> Result<TaskRecord, ServiceError> {
        let id = TaskId::random();
        let file_paths = self.storage.persist(&id, &documents).await?;
        let record = self.store.create(id.clone(), file_paths)?;

        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            pipeline.run(id).await;
        });

        info!(task = %record.id, "contestation task accepted");
        Ok(record)
    }

    pub fn status(&self, id: &TaskId) -> Option<TaskRecord> {
        self.store.get(id)
    }

    pub fn list(&self) -> Vec<TaskSummary> {
        self.store.list()
    }

    /// Loads the rendered artifact of a COMPLETED task.
    pub async fn artifact(&self, id: &TaskId) -> Result<ContestationArtifact, ServiceError> {
        let record = self.store.get(id).ok_or(StoreError::NotFound)?;
        if record.status != TaskStatus::Completed {
            return Err(ServiceError::NotCompleted {
                current: record.status,
            });
        }
        let path = record.result_file.ok_or(ServiceError::MissingArtifact)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| ServiceError::MissingArtifact)?;
        Ok(ContestationArtifact { path, bytes })
    }

    /// Removes the record and releases its stored files. An in-flight
    /// pipeline keeps running; its later updates land nowhere.
    pub async fn delete(&self, id: &TaskId) -> Result<(), ServiceError> {
        let record = self.store.delete(id)?;
        self.storage.release(&record).await;
        Ok(())
    }
}
