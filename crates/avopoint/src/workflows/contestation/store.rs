use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::formfill::FormReport;
use super::status::TaskStatus;
use super::validation::ValidationResult;
use crate::documents::{DocumentKind, DocumentSet};

/// Opaque task identifier, assigned at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One end-to-end contestation attempt and its mutable progress record.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub progress: i8,
    pub message: String,
    pub current_step: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub file_paths: BTreeMap<DocumentKind, PathBuf>,
    pub documents: DocumentSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_report: Option<FormReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_file: Option<PathBuf>,
}

impl TaskRecord {
    fn new(id: TaskId, file_paths: BTreeMap<DocumentKind, PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: TaskStatus::Uploaded,
            progress: TaskStatus::Uploaded.progress(),
            message: TaskStatus::Uploaded.message().to_string(),
            current_step: TaskStatus::Uploaded,
            created_at: now,
            updated_at: now,
            error: None,
            file_paths,
            documents: DocumentSet::default(),
            validation: None,
            form_report: None,
            driver_visible: None,
            result_file: None,
        }
    }
}

/// Listing projection used by the diagnostics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub progress: i8,
    pub created_at: DateTime<Utc>,
}

/// Data written onto a record by the pipeline, one atomic mutation each.
#[derive(Debug, Clone)]
pub enum TaskUpdate {
    Documents(DocumentSet),
    Validation(ValidationResult),
    FormReport(FormReport),
    DriverVisible(bool),
    ResultFile(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task already exists")]
    Conflict,
    #[error("task not found")]
    NotFound,
}

/// Keyed storage of task records, single writer per key.
///
/// `advance`, `fail`, and `apply` are deliberately infallible: a pipeline
/// whose record was deleted mid-flight keeps running, and its remaining
/// updates land nowhere.
pub trait TaskStore: Send + Sync {
    fn create(
        &self,
        id: TaskId,
        file_paths: BTreeMap<DocumentKind, PathBuf>,
    ) -> Result<TaskRecord, StoreError>;
    fn advance(&self, id: &TaskId, status: TaskStatus, message: Option<String>);
    fn fail(&self, id: &TaskId, error: String);
    fn apply(&self, id: &TaskId, update: TaskUpdate);
    fn get(&self, id: &TaskId) -> Option<TaskRecord>;
    fn delete(&self, id: &TaskId) -> Result<TaskRecord, StoreError>;
    fn list(&self) -> Vec<TaskSummary>;
}

/// Process-local store; empty on startup, nothing survives a restart.
#[derive(Default)]
pub struct InMemoryTaskStore {
    records: Mutex<HashMap<TaskId, TaskRecord>>,
}

impl TaskStore for InMemoryTaskStore {
    fn create(
        &self,
        id: TaskId,
        file_paths: BTreeMap<DocumentKind, PathBuf>,
    ) -> Result<TaskRecord, StoreError> {
        let mut guard = self.records.lock().expect("task store mutex poisoned");
        if guard.contains_key(&id) {
            return Err(StoreError::Conflict);
        }
        let record = TaskRecord::new(id.clone(), file_paths);
        guard.insert(id, record.clone());
        Ok(record)
    }

    fn advance(&self, id: &TaskId, status: TaskStatus, message: Option<String>) {
        let mut guard = self.records.lock().expect("task store mutex poisoned");
        if let Some(task) = guard.get_mut(id) {
            task.status = status;
            task.current_step = status;
            task.progress = status.progress();
            task.message = message.unwrap_or_else(|| status.message().to_string());
            task.updated_at = Utc::now();
        }
    }

    fn fail(&self, id: &TaskId, error: String) {
        let mut guard = self.records.lock().expect("task store mutex poisoned");
        if let Some(task) = guard.get_mut(id) {
            task.status = TaskStatus::Failed;
            task.current_step = TaskStatus::Failed;
            task.progress = TaskStatus::Failed.progress();
            task.message = TaskStatus::Failed.message().to_string();
            task.error = Some(error);
            task.updated_at = Utc::now();
        }
    }

    fn apply(&self, id: &TaskId, update: TaskUpdate) {
        let mut guard = self.records.lock().expect("task store mutex poisoned");
        if let Some(task) = guard.get_mut(id) {
            match update {
                TaskUpdate::Documents(documents) => task.documents = documents,
                TaskUpdate::Validation(validation) => task.validation = Some(validation),
                TaskUpdate::FormReport(report) => task.form_report = Some(report),
                TaskUpdate::DriverVisible(visible) => task.driver_visible = Some(visible),
                TaskUpdate::ResultFile(path) => task.result_file = Some(path),
            }
            task.updated_at = Utc::now();
        }
    }

    fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        let guard = self.records.lock().expect("task store mutex poisoned");
        guard.get(id).cloned()
    }

    fn delete(&self, id: &TaskId) -> Result<TaskRecord, StoreError> {
        let mut guard = self.records.lock().expect("task store mutex poisoned");
        guard.remove(id).ok_or(StoreError::NotFound)
    }

    fn list(&self) -> Vec<TaskSummary> {
        let guard = self.records.lock().expect("task store mutex poisoned");
        guard
            .values()
            .map(|task| TaskSummary {
                task_id: task.id.clone(),
                status: task.status,
                progress: task.progress,
                created_at: task.created_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::contestation::validation::ValidationResult;

    fn sample_paths() -> BTreeMap<DocumentKind, PathBuf> {
        let mut paths = BTreeMap::new();
        paths.insert(
            DocumentKind::Contravention,
            PathBuf::from("uploads/t-1/contravention_avis.png"),
        );
        paths
    }

    #[test]
    fn create_rejects_duplicate_ids() {
        let store = InMemoryTaskStore::default();
        let id = TaskId("t-1".to_string());
        let record = store.create(id.clone(), sample_paths()).expect("created");
        assert_eq!(record.status, TaskStatus::Uploaded);
        assert_eq!(record.progress, 0);
        assert!(matches!(
            store.create(id, sample_paths()),
            Err(StoreError::Conflict)
        ));
    }

    #[test]
    fn advance_applies_the_status_table_and_refreshes_updated_at() {
        let store = InMemoryTaskStore::default();
        let id = TaskId("t-2".to_string());
        let created = store.create(id.clone(), sample_paths()).expect("created");

        store.advance(&id, TaskStatus::Validating, None);
        let task = store.get(&id).expect("present");
        assert_eq!(task.status, TaskStatus::Validating);
        assert_eq!(task.progress, 40);
        assert_eq!(task.message, TaskStatus::Validating.message());
        assert!(task.updated_at >= created.updated_at);

        store.advance(
            &id,
            TaskStatus::FillingForm,
            Some("custom message".to_string()),
        );
        let task = store.get(&id).expect("present");
        assert_eq!(task.message, "custom message");
    }

    #[test]
    fn advance_and_fail_ignore_unknown_ids() {
        let store = InMemoryTaskStore::default();
        let ghost = TaskId("ghost".to_string());
        store.advance(&ghost, TaskStatus::Validating, None);
        store.fail(&ghost, "boom".to_string());
        store.apply(&ghost, TaskUpdate::DriverVisible(true));
        assert!(store.get(&ghost).is_none());
    }

    #[test]
    fn fail_sets_the_sentinel_and_keeps_the_record_queryable() {
        let store = InMemoryTaskStore::default();
        let id = TaskId("t-3".to_string());
        store.create(id.clone(), sample_paths()).expect("created");

        store.fail(&id, "extraction blew up".to_string());
        let task = store.get(&id).expect("still queryable");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.progress, -1);
        assert_eq!(task.error.as_deref(), Some("extraction blew up"));
        assert!(task.result_file.is_none());
    }

    #[test]
    fn apply_stores_pipeline_outputs() {
        let store = InMemoryTaskStore::default();
        let id = TaskId("t-4".to_string());
        store.create(id.clone(), sample_paths()).expect("created");

        store.apply(&id, TaskUpdate::DriverVisible(false));
        store.apply(
            &id,
            TaskUpdate::Validation(ValidationResult::error_with("collaborator down")),
        );
        store.apply(&id, TaskUpdate::ResultFile(PathBuf::from("results/x.pdf")));

        let task = store.get(&id).expect("present");
        assert_eq!(task.driver_visible, Some(false));
        assert!(task.validation.is_some());
        assert_eq!(task.result_file, Some(PathBuf::from("results/x.pdf")));
    }

    #[test]
    fn delete_returns_the_record_and_forgets_it() {
        let store = InMemoryTaskStore::default();
        let id = TaskId("t-5".to_string());
        store.create(id.clone(), sample_paths()).expect("created");

        let removed = store.delete(&id).expect("removed");
        assert_eq!(removed.id, id);
        assert!(store.get(&id).is_none());
        assert!(matches!(store.delete(&id), Err(StoreError::NotFound)));
        assert!(store.list().is_empty());
    }
}
