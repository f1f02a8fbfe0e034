use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::error::UploadError;
use crate::models::{
    AdmitRequest, AdmitResponse, BatchDeleteRequest, BatchDeleteResponse, BatchDeleteResult,
    DeleteResponse, ErrorResponse, FileDescriptor, Session, SessionListResponse, SessionView,
    UploadListResponse, UploadRecord, UploadSummary,
};
use crate::share::qr_code_url;
use crate::state::AppState;
use crate::uploads::{AdmitOutcome, UploadService};

fn admit_response(outcome: AdmitOutcome) -> Json<AdmitResponse> {
    Json(AdmitResponse {
        admitted: outcome.admitted,
        rejected: outcome.rejected.iter().map(|r| r.to_string()).collect(),
    })
}

// anything that reads or writes the store runs on the blocking pool
async fn with_store<T, F>(state: &Arc<AppState>, f: F) -> Result<T, UploadError>
where
    F: FnOnce(&UploadService) -> T + Send + 'static,
    T: Send + 'static,
{
    let uploads = state.uploads.clone();
    tokio::task::spawn_blocking(move || f(&uploads))
        .await
        .map_err(|e| UploadError::Internal(format!("store task failed: {}", e)))
}

// admit a batch of file descriptors sent as json
pub async fn admit_files(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdmitRequest>,
) -> Result<Json<AdmitResponse>, UploadError> {
    tracing::debug!("Admitting batch of {} file(s)", payload.files.len());
    let outcome = with_store(&state, move |uploads| uploads.admit(payload.files)).await?;
    Ok(admit_response(outcome))
}

// admit files sent as multipart form data; only name, size and type are kept
pub async fn admit_multipart(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AdmitResponse>, (StatusCode, Json<ErrorResponse>)> {
    tracing::debug!("Processing multipart admission");
    let mut files = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Failed to read multipart field: {}", e),
            }),
        )
    })? {
        // skip plain form values
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime_type = field.content_type().unwrap_or_default().to_string();

        // count the bytes without holding them, the transfer itself is simulated
        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            tracing::error!("Failed to read data for {}: {}", name, e);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Failed to read file data: {}", e),
                }),
            )
        })? {
            size += chunk.len() as u64;
        }

        tracing::trace!("Received {} ({} bytes, type {:?})", name, size, mime_type);
        files.push(FileDescriptor::new(name, size, mime_type));
    }

    if files.is_empty() {
        tracing::warn!("Multipart request contained no file field");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No file provided".to_string(),
            }),
        ));
    }

    let outcome = with_store(&state, move |uploads| uploads.admit(files))
        .await
        .map_err(|e| {
            (
                e.status_code(),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })?;
    Ok(admit_response(outcome))
}

// list all upload records
pub async fn list_uploads(State(state): State<Arc<AppState>>) -> Json<UploadListResponse> {
    let files = state.uploads.list();
    let total = files.len();
    tracing::debug!("Listing {} upload(s)", total);
    Json(UploadListResponse { files, total })
}

// fetch a single record
pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UploadRecord>, UploadError> {
    state.uploads.get(&id).map(Json)
}

// delete a record and stop its simulation
pub async fn delete_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, UploadError> {
    tracing::debug!("Request to delete upload: {}", id);
    let target = id.clone();
    with_store(&state, move |uploads| uploads.delete(&target)).await??;
    Ok(Json(DeleteResponse { success: true, id }))
}

// restart a pending or failed upload
pub async fn retry_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UploadRecord>, UploadError> {
    state.uploads.retry(&id).map(Json)
}

// batch delete multiple records
pub async fn batch_delete_uploads(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatchDeleteRequest>,
) -> Result<Json<BatchDeleteResponse>, UploadError> {
    let outcomes = with_store(&state, move |uploads| uploads.delete_many(&payload.ids)).await?;
    let results: Vec<BatchDeleteResult> = outcomes
        .into_iter()
        .map(|(id, outcome)| match outcome {
            Ok(()) => BatchDeleteResult {
                id,
                success: true,
                error: None,
            },
            Err(e) => BatchDeleteResult {
                id,
                success: false,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let total = results.len();
    let successful = results.iter().filter(|r| r.success).count();
    let failed = total - successful;
    tracing::info!("📦 Batch delete completed: {}/{} successful", successful, total);

    Ok(Json(BatchDeleteResponse {
        total,
        successful,
        failed,
        results,
    }))
}

// counters for the summary panel
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<UploadSummary> {
    Json(state.uploads.summary())
}

// the live share session, 204 while nothing has completed
pub async fn get_current_session(State(state): State<Arc<AppState>>) -> Response {
    match state.uploads.current_session() {
        Some(session) => {
            let qr_code_url = qr_code_url(&session.shareable_link);
            Json(SessionView {
                session,
                qr_code_url,
            })
            .into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

// persist the current completed set as a shared session
pub async fn publish_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<Session>), UploadError> {
    let session = with_store(&state, |uploads| uploads.publish_session()).await??;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionListResponse>, UploadError> {
    let sessions = with_store(&state, |uploads| uploads.sessions()).await?;
    let total = sessions.len();
    Ok(Json(SessionListResponse { sessions, total }))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, UploadError> {
    with_store(&state, move |uploads| uploads.session(&id)).await?.map(Json)
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, UploadError> {
    let target = id.clone();
    with_store(&state, move |uploads| uploads.delete_session(&target)).await??;
    Ok(Json(DeleteResponse { success: true, id }))
}

// health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "dropzone-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
