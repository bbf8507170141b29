use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use super::extraction::DocumentExtractor;
use super::formfill::FormGateway;
use super::photo::DriverVisibilityAnalyzer;
use super::service::{ContestationService, ServiceError};
use super::status::TaskStatus;
use super::storage::IncomingDocument;
use super::store::{StoreError, TaskId, TaskStore};
use super::validation::ReasoningGateway;
use crate::documents::DocumentKind;

const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Uploads can carry four scanned documents; 16 MiB leaves headroom over
/// axum's 2 MiB default.
const UPLOAD_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Router builder exposing the contestation endpoints.
pub fn contestation_router<S, E, R, F, P>(
    service: Arc<ContestationService<S, E, R, F, P>>,
) -> Router
where
    S: TaskStore + 'static,
    E: DocumentExtractor + 'static,
    R: ReasoningGateway + 'static,
    F: FormGateway + 'static,
    P: DriverVisibilityAnalyzer + 'static,
{
    Router::new()
        .route(
            "/api/v1/process-documents",
            post(process_documents_handler::<S, E, R, F, P>)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/v1/task/:task_id/status",
            get(task_status_handler::<S, E, R, F, P>),
        )
        .route(
            "/api/v1/task/:task_id/result",
            get(task_result_handler::<S, E, R, F, P>),
        )
        .route(
            "/api/v1/task/:task_id",
            delete(delete_task_handler::<S, E, R, F, P>),
        )
        .route("/api/v1/tasks", get(list_tasks_handler::<S, E, R, F, P>))
        .with_state(service)
}

pub(crate) async fn process_documents_handler<S, E, R, F, P>(
    State(service): State<Arc<ContestationService<S, E, R, F, P>>>,
    mut multipart: Multipart,
) -> Response
where
    S: TaskStore + 'static,
    E: DocumentExtractor + 'static,
    R: ReasoningGateway + 'static,
    F: FormGateway + 'static,
    P: DriverVisibilityAnalyzer + 'static,
{
    let mut documents: Vec<IncomingDocument> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return client_error(format!("malformed multipart request: {err}"));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let Some(kind) = DocumentKind::from_field_name(&name) else {
            return client_error(format!("unexpected document part '{name}'"));
        };

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return client_error(format!(
                "unsupported content type for {kind}: {content_type}"
            ));
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{kind}.bin"));
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => {
                return client_error(format!("unable to read the {kind} part: {err}"));
            }
        };

        documents.push(IncomingDocument {
            kind,
            filename,
            bytes,
        });
    }

    let missing: Vec<&str> = DocumentKind::ordered()
        .into_iter()
        .filter(|kind| documents.iter().all(|doc| doc.kind != *kind))
        .map(DocumentKind::as_str)
        .collect();
    if !missing.is_empty() {
        return client_error(format!("missing document parts: {}", missing.join(", ")));
    }

    match service.submit(documents).await {
        Ok(record) => {
            let payload = json!({
                "task_id": record.id,
                "status": "processing",
                "message": "Documents received, processing started",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn task_status_handler<S, E, R, F, P>(
    State(service): State<Arc<ContestationService<S, E, R, F, P>>>,
    Path(task_id): Path<String>,
) -> Response
where
    S: TaskStore + 'static,
    E: DocumentExtractor + 'static,
    R: ReasoningGateway + 'static,
    F: FormGateway + 'static,
    P: DriverVisibilityAnalyzer + 'static,
{
    let id = TaskId(task_id);
    let Some(record) = service.status(&id) else {
        return not_found();
    };

    // Completed tasks surface the validation verdict inline.
    let mut message = record.message.clone();
    if record.status == TaskStatus::Completed {
        if let Some(validation) = &record.validation {
            message = format!("{message} - Validation: {}", validation.status.as_str());
        }
    }

    let payload = json!({
        "task_id": record.id,
        "status": record.status,
        "progress": record.progress,
        "message": message,
        "current_step": record.current_step,
        "created_at": record.created_at,
        "updated_at": record.updated_at,
        "error": record.error,
    });
    (StatusCode::OK, Json(payload)).into_response()
}

pub(crate) async fn task_result_handler<S, E, R, F, P>(
    State(service): State<Arc<ContestationService<S, E, R, F, P>>>,
    Path(task_id): Path<String>,
) -> Response
where
    S: TaskStore + 'static,
    E: DocumentExtractor + 'static,
    R: ReasoningGateway + 'static,
    F: FormGateway + 'static,
    P: DriverVisibilityAnalyzer + 'static,
{
    let id = TaskId(task_id);
    match service.artifact(&id).await {
        Ok(artifact) => {
            let extension = artifact
                .path
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or("bin");
            let filename = format!("contestation_{id}.{extension}");
            let content_type = match extension {
                "pdf" => "application/pdf",
                "html" => "text/html; charset=utf-8",
                _ => "application/octet-stream",
            };
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                artifact.bytes,
            )
                .into_response()
        }
        Err(ServiceError::Store(StoreError::NotFound)) => not_found(),
        Err(ServiceError::NotCompleted { current }) => client_error(format!(
            "task not finished yet, current status {}",
            current.as_wire_str()
        )),
        Err(ServiceError::MissingArtifact) => {
            let payload = json!({ "error": "result file not found" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn delete_task_handler<S, E, R, F, P>(
    State(service): State<Arc<ContestationService<S, E, R, F, P>>>,
    Path(task_id): Path<String>,
) -> Response
where
    S: TaskStore + 'static,
    E: DocumentExtractor + 'static,
    R: ReasoningGateway + 'static,
    F: FormGateway + 'static,
    P: DriverVisibilityAnalyzer + 'static,
{
    let id = TaskId(task_id);
    match service.delete(&id).await {
        Ok(()) => {
            let payload = json!({ "message": format!("task {id} deleted") });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(ServiceError::Store(StoreError::NotFound)) => not_found(),
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn list_tasks_handler<S, E, R, F, P>(
    State(service): State<Arc<ContestationService<S, E, R, F, P>>>,
) -> Response
where
    S: TaskStore + 'static,
    E: DocumentExtractor + 'static,
    R: ReasoningGateway + 'static,
    F: FormGateway + 'static,
    P: DriverVisibilityAnalyzer + 'static,
{
    let payload = json!({ "tasks": service.list() });
    (StatusCode::OK, Json(payload)).into_response()
}

fn client_error(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn not_found() -> Response {
    let payload = json!({ "error": "task not found" });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}
