use serde::{Deserialize, Serialize};

// lifecycle state of a single upload record
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// one file tracked through the simulated upload lifecycle
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: String,
    pub status: UploadStatus,
    #[serde(default)]
    pub progress: f64,
    /// MB/s, zero unless uploading
    #[serde(default)]
    pub upload_speed: f64,
    #[serde(default)]
    pub share_link: String,
    /// preview handle owned by the presentation layer, never persisted
    #[serde(skip)]
    pub thumbnail_ref: Option<String>,
    pub uploaded_at: String,
}

impl UploadRecord {
    /// pending -> uploading, or error/pending -> uploading on retry
    pub fn start_attempt(&self) -> Self {
        Self {
            status: UploadStatus::Uploading,
            progress: 0.0,
            upload_speed: 0.0,
            share_link: String::new(),
            ..self.clone()
        }
    }

    /// advance within uploading; progress never moves backwards
    pub fn advance(&self, increment: f64, speed: f64) -> Self {
        let progress = (self.progress + increment.max(0.0)).min(100.0);
        Self {
            progress,
            upload_speed: if progress < 100.0 { speed.max(0.0) } else { 0.0 },
            ..self.clone()
        }
    }

    pub fn complete(&self, share_link: String) -> Self {
        Self {
            status: UploadStatus::Completed,
            progress: 100.0,
            upload_speed: 0.0,
            share_link,
            ..self.clone()
        }
    }

    pub fn fail(&self) -> Self {
        Self {
            status: UploadStatus::Error,
            progress: 0.0,
            upload_speed: 0.0,
            share_link: String::new(),
            ..self.clone()
        }
    }
}

// raw file handle handed in by the presentation layer
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub thumbnail_ref: Option<String>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            thumbnail_ref: None,
        }
    }
}

/// snapshot of every completed record, shareable as one link
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub files: Vec<UploadRecord>,
    pub total_size: u64,
    pub completed_size: u64,
    pub shareable_link: String,
    pub start_time: String,
}

// counters shown above the file list
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub total_files: usize,
    pub pending_files: usize,
    pub uploading_files: usize,
    pub completed_files: usize,
    pub error_files: usize,
    pub total_size: u64,
    pub completed_size: u64,
    pub total_size_label: String,
    pub completed_size_label: String,
    pub overall_progress: f64,
    pub all_completed: bool,
}

// request body for a json batch admission
#[derive(Deserialize, Debug)]
pub struct AdmitRequest {
    pub files: Vec<FileDescriptor>,
}

// response for batch admission: what got in and what was turned away
#[derive(Serialize, Debug)]
pub struct AdmitResponse {
    pub admitted: Vec<UploadRecord>,
    pub rejected: Vec<String>,
}

// response for listing records
#[derive(Serialize, Debug)]
pub struct UploadListResponse {
    pub files: Vec<UploadRecord>,
    pub total: usize,
}

// response for record deletion
#[derive(Serialize, Debug)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: String,
}

// live session plus the qr image url for its link
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub qr_code_url: String,
}

// response for listing published sessions
#[derive(Serialize, Debug)]
pub struct SessionListResponse {
    pub sessions: Vec<Session>,
    pub total: usize,
}

// generic error response
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

// request for batch delete operation
#[derive(Deserialize, Debug)]
pub struct BatchDeleteRequest {
    pub ids: Vec<String>,
}

// result of a single deletion in batch operation
#[derive(Serialize, Debug)]
pub struct BatchDeleteResult {
    pub id: String,
    pub success: bool,
    pub error: Option<String>,
}

// response for batch delete operation
#[derive(Serialize, Debug)]
pub struct BatchDeleteResponse {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchDeleteResult>,
}
