use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::{ErrorResponse, UploadStatus};

/// caller-visible failures of the upload and session services.
/// persistence failures never show up here, the store swallows them.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Cannot restart upload {id} while it is {status}")]
    InvalidTransition { id: String, status: UploadStatus },
    #[error("No completed files to create session")]
    NoCompletedFiles,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::NoCompletedFiles => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{}", self);
        } else if status == StatusCode::NOT_FOUND {
            tracing::warn!("{}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// failures of the raw key-value backend
#[derive(thiserror::Error, Debug)]
pub enum KvError {
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}
