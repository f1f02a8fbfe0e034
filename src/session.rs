use std::sync::Mutex;

use crate::ids::IdGenerator;
use crate::models::{Session, UploadRecord, UploadStatus, UploadSummary};
use crate::share::LinkBuilder;
use crate::utils::format_file_size;

/// builds the shareable view over completed records
#[derive(Clone)]
pub struct SessionAggregator {
    ids: IdGenerator,
    links: LinkBuilder,
}

impl SessionAggregator {
    pub fn new(ids: IdGenerator, links: LinkBuilder) -> Self {
        Self { ids, links }
    }

    /// None when nothing has completed yet
    pub fn aggregate(&self, records: &[UploadRecord]) -> Option<Session> {
        let files: Vec<UploadRecord> = records
            .iter()
            .filter(|r| r.status == UploadStatus::Completed)
            .cloned()
            .collect();

        if files.is_empty() {
            return None;
        }

        let total_size = files.iter().map(|f| f.size).sum();
        Some(Session {
            session_id: self.ids.session_id(),
            files,
            total_size,
            completed_size: total_size,
            shareable_link: self.links.new_session_link(),
            start_time: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// keeps the last aggregated session and only rebuilds it when the number
/// of completed records changes. edits to an already completed record do
/// not show up until that count moves.
pub struct SessionTracker {
    aggregator: SessionAggregator,
    current: Mutex<TrackedSession>,
}

#[derive(Default)]
struct TrackedSession {
    completed: Option<usize>,
    session: Option<Session>,
}

impl SessionTracker {
    pub fn new(aggregator: SessionAggregator) -> Self {
        Self {
            aggregator,
            current: Mutex::new(TrackedSession::default()),
        }
    }

    pub fn aggregator(&self) -> &SessionAggregator {
        &self.aggregator
    }

    pub fn refresh(&self, records: &[UploadRecord]) -> Option<Session> {
        let completed = records
            .iter()
            .filter(|r| r.status == UploadStatus::Completed)
            .count();

        let mut tracked = self.current.lock().unwrap_or_else(|p| p.into_inner());
        if tracked.completed != Some(completed) {
            tracing::debug!(
                "Completed count changed {:?} -> {}, rebuilding session",
                tracked.completed,
                completed
            );
            tracked.session = self.aggregator.aggregate(records);
            tracked.completed = Some(completed);
        }
        tracked.session.clone()
    }
}

pub fn summarize(records: &[UploadRecord]) -> UploadSummary {
    let count = |status: UploadStatus| records.iter().filter(|r| r.status == status).count();

    let total_files = records.len();
    let completed_files = count(UploadStatus::Completed);
    let total_size: u64 = records.iter().map(|r| r.size).sum();
    let completed_size: u64 = records
        .iter()
        .filter(|r| r.status == UploadStatus::Completed)
        .map(|r| r.size)
        .sum();

    let overall_progress = if total_files > 0 {
        completed_files as f64 / total_files as f64 * 100.0
    } else {
        0.0
    };

    UploadSummary {
        total_files,
        pending_files: count(UploadStatus::Pending),
        uploading_files: count(UploadStatus::Uploading),
        completed_files,
        error_files: count(UploadStatus::Error),
        total_size,
        completed_size,
        total_size_label: format_file_size(total_size),
        completed_size_label: format_file_size(completed_size),
        overall_progress,
        all_completed: total_files > 0 && completed_files == total_files,
    }
}
