use std::fmt;

use crate::models::FileDescriptor;
use crate::utils::format_file_size;

/// 100 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

/// size and type gate applied before a file enters the lifecycle
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_file_size: u64,
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    TooLarge { max: u64 },
    UnsupportedType { mime_type: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectionReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectionReason::TooLarge { max } => write!(
                f,
                "{} is too large (max {})",
                self.name,
                format_file_size(*max).replace(' ', "")
            ),
            RejectionReason::UnsupportedType { .. } => write!(f, "{} type not supported", self.name),
        }
    }
}

/// outcome of validating a batch; accepted keeps the input order
#[derive(Debug, Default)]
pub struct BatchValidation {
    pub accepted: Vec<FileDescriptor>,
    pub rejected: Vec<Rejection>,
}

impl UploadPolicy {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn check(&self, file: &FileDescriptor) -> Result<(), Rejection> {
        if file.size > self.max_file_size {
            return Err(Rejection {
                name: file.name.clone(),
                reason: RejectionReason::TooLarge {
                    max: self.max_file_size,
                },
            });
        }

        // an unknown (empty) type gets the benefit of the doubt
        let mime_type = file.mime_type.trim();
        if !mime_type.is_empty() && !self.allowed_mime_types.iter().any(|t| t == mime_type) {
            return Err(Rejection {
                name: file.name.clone(),
                reason: RejectionReason::UnsupportedType {
                    mime_type: mime_type.to_string(),
                },
            });
        }

        Ok(())
    }

    pub fn partition(&self, files: Vec<FileDescriptor>) -> BatchValidation {
        let mut batch = BatchValidation::default();
        for file in files {
            match self.check(&file) {
                Ok(()) => batch.accepted.push(file),
                Err(rejection) => {
                    tracing::warn!("Rejected upload: {}", rejection);
                    batch.rejected.push(rejection);
                }
            }
        }
        batch
    }
}
