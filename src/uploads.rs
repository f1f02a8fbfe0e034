use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::AbortHandle;

use crate::error::UploadError;
use crate::ids::IdGenerator;
use crate::kv::KvStore;
use crate::models::{FileDescriptor, Session, UploadRecord, UploadStatus, UploadSummary};
use crate::random::{RandomSource, SeededRandom};
use crate::session::{summarize, SessionAggregator, SessionTracker};
use crate::share::LinkBuilder;
use crate::simulator::{AttemptPlan, Scheduler, SimulationTuning, Simulator, Step, TokioScheduler};
use crate::store::{upsert_record, HistoryStore, SessionStore};
use crate::validation::{Rejection, UploadPolicy};

pub const DEFAULT_SHARE_DOMAIN: &str = "dropzone.pro";

/// result of admitting a batch of files
#[derive(Debug)]
pub struct AdmitOutcome {
    /// records as created, still pending, in input order
    pub admitted: Vec<UploadRecord>,
    pub rejected: Vec<Rejection>,
}

// a record plus its admission order
#[derive(Clone)]
struct LiveRecord {
    seq: u64,
    record: UploadRecord,
}

struct Inner {
    records: DashMap<String, LiveRecord>,
    tasks: DashMap<String, AbortHandle>,
    next_seq: AtomicU64,
    history: HistoryStore,
    sessions: SessionStore,
    tracker: SessionTracker,
    simulator: Simulator,
    scheduler: Arc<dyn Scheduler>,
    ids: IdGenerator,
    policy: UploadPolicy,
}

/// owns the live record set and drives every upload attempt.
///
/// records live in memory for fast progress updates; the history store is
/// written on admission, on completion/failure and on deletion. cloning is
/// cheap and clones share state.
#[derive(Clone)]
pub struct UploadService {
    inner: Arc<Inner>,
}

pub struct UploadServiceBuilder {
    kv: Arc<dyn KvStore>,
    policy: UploadPolicy,
    tuning: SimulationTuning,
    share_domain: String,
    random: Option<Arc<dyn RandomSource>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl UploadServiceBuilder {
    pub fn policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tuning(mut self, tuning: SimulationTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn share_domain(mut self, domain: impl Into<String>) -> Self {
        self.share_domain = domain.into();
        self
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> UploadService {
        let random = self
            .random
            .unwrap_or_else(|| Arc::new(SeededRandom::from_entropy()));
        let scheduler = self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler));
        let links = LinkBuilder::new(self.share_domain);
        let ids = IdGenerator::new(random.clone());

        let inner = Inner {
            records: DashMap::new(),
            tasks: DashMap::new(),
            next_seq: AtomicU64::new(0),
            history: HistoryStore::history(self.kv.clone()),
            sessions: SessionStore::sessions(self.kv),
            tracker: SessionTracker::new(SessionAggregator::new(ids.clone(), links.clone())),
            simulator: Simulator::new(self.tuning, random, links),
            scheduler,
            ids,
            policy: self.policy,
        };
        inner.hydrate();

        UploadService {
            inner: Arc::new(inner),
        }
    }
}

impl UploadService {
    pub fn builder(kv: Arc<dyn KvStore>) -> UploadServiceBuilder {
        UploadServiceBuilder {
            kv,
            policy: UploadPolicy::default(),
            tuning: SimulationTuning::default(),
            share_domain: DEFAULT_SHARE_DOMAIN.to_string(),
            random: None,
            scheduler: None,
        }
    }

    /// validate a batch, create pending records for the valid files and start
    /// simulating each one. must be called from within a tokio runtime.
    pub fn admit(&self, files: Vec<FileDescriptor>) -> AdmitOutcome {
        let batch = self.inner.policy.partition(files);
        let uploaded_at = chrono::Utc::now().to_rfc3339();

        let admitted: Vec<UploadRecord> = batch
            .accepted
            .into_iter()
            .map(|file| {
                let is_image = file.mime_type.starts_with("image/");
                self.inner.claim(UploadRecord {
                    id: self.inner.ids.file_id(),
                    name: file.name,
                    size: file.size,
                    mime_type: file.mime_type,
                    status: UploadStatus::Pending,
                    progress: 0.0,
                    upload_speed: 0.0,
                    share_link: String::new(),
                    thumbnail_ref: file.thumbnail_ref.filter(|_| is_image),
                    uploaded_at: uploaded_at.clone(),
                })
            })
            .collect();

        if !admitted.is_empty() {
            self.inner.history.modify(|records| {
                for record in &admitted {
                    upsert_record(records, record);
                }
            });
            tracing::info!(
                "📥 Admitted {} file(s), rejected {}",
                admitted.len(),
                batch.rejected.len()
            );
        }

        for record in &admitted {
            self.launch(record);
        }

        AdmitOutcome {
            admitted,
            rejected: batch.rejected,
        }
    }

    /// every live record in admission order
    pub fn list(&self) -> Vec<UploadRecord> {
        let mut live: Vec<LiveRecord> = self
            .inner
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        live.sort_by_key(|l| l.seq);
        live.into_iter().map(|l| l.record).collect()
    }

    pub fn get(&self, id: &str) -> Result<UploadRecord, UploadError> {
        self.inner
            .snapshot(id)
            .ok_or_else(|| UploadError::NotFound(id.to_string()))
    }

    /// removes the record everywhere and stops its simulator
    pub fn delete(&self, id: &str) -> Result<(), UploadError> {
        let (_, removed) = self
            .inner
            .records
            .remove(id)
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;

        if let Some((_, task)) = self.inner.tasks.remove(id) {
            task.abort();
        }
        if let Err(e) = self.inner.history.remove(id) {
            tracing::debug!("Upload {} had no stored entry: {}", id, e);
        }

        tracing::info!("🗑️  Deleted upload: {} ({})", removed.record.name, id);
        Ok(())
    }

    /// deletes each id independently, unknown ids are reported not fatal
    pub fn delete_many(&self, ids: &[String]) -> Vec<(String, Result<(), UploadError>)> {
        ids.iter()
            .map(|id| (id.clone(), self.delete(id)))
            .collect()
    }

    /// start a new attempt for a pending or failed record
    pub fn retry(&self, id: &str) -> Result<UploadRecord, UploadError> {
        let record = self.get(id)?;
        match record.status {
            UploadStatus::Pending | UploadStatus::Error => {}
            status => {
                return Err(UploadError::InvalidTransition {
                    id: id.to_string(),
                    status,
                })
            }
        }

        tracing::info!("🔁 Retrying upload: {} ({})", record.name, id);
        self.launch(&record);
        self.get(id)
    }

    pub fn summary(&self) -> UploadSummary {
        summarize(&self.list())
    }

    /// live share view, rebuilt only when the completed count changes
    pub fn current_session(&self) -> Option<Session> {
        self.inner.tracker.refresh(&self.list())
    }

    /// persist a fresh session over the currently completed records
    pub fn publish_session(&self) -> Result<Session, UploadError> {
        let session = self
            .inner
            .tracker
            .aggregator()
            .aggregate(&self.list())
            .ok_or(UploadError::NoCompletedFiles)?;

        self.inner.sessions.modify(|sessions| sessions.push(session.clone()));
        tracing::info!(
            "🔗 Published session {} with {} file(s)",
            session.session_id,
            session.files.len()
        );
        Ok(session)
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.sessions.load()
    }

    pub fn session(&self, session_id: &str) -> Result<Session, UploadError> {
        self.inner
            .sessions
            .find(session_id)
            .ok_or_else(|| UploadError::SessionNotFound(session_id.to_string()))
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), UploadError> {
        if !self.inner.sessions.remove(session_id) {
            return Err(UploadError::SessionNotFound(session_id.to_string()));
        }
        tracing::info!("🗑️  Deleted session: {}", session_id);
        Ok(())
    }

    fn launch(&self, record: &UploadRecord) {
        let (started, plan) = self.inner.simulator.begin(record);
        if !self.inner.replace_live(&started) {
            return;
        }
        tracing::debug!(
            "Upload {} entered uploading (doomed: {})",
            started.id,
            plan.abort_after.is_some()
        );

        let id = started.id.clone();
        let inner = self.inner.clone();
        let task = tokio::spawn(inner.drive(id.clone(), plan));
        if let Some(previous) = self.inner.tasks.insert(id, task.abort_handle()) {
            previous.abort();
        }
    }
}

impl Inner {
    // pull persisted history into memory; an attempt cut off by a restart is failed
    fn hydrate(&self) {
        let mut interrupted = Vec::new();
        for record in self.history.load() {
            let record = if record.status == UploadStatus::Uploading {
                let failed = record.fail();
                interrupted.push(failed.clone());
                failed
            } else {
                record
            };
            self.insert_live(record);
        }

        if !interrupted.is_empty() {
            tracing::warn!("Marking {} interrupted upload(s) as failed", interrupted.len());
            self.history.modify(|records| {
                for record in &interrupted {
                    upsert_record(records, record);
                }
            });
        }
        tracing::debug!("Hydrated {} upload record(s)", self.records.len());
    }

    fn insert_live(&self, record: UploadRecord) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.records.insert(record.id.clone(), LiveRecord { seq, record });
    }

    // make a new record live under an id nobody else holds
    fn claim(&self, mut record: UploadRecord) -> UploadRecord {
        loop {
            match self.records.entry(record.id.clone()) {
                Entry::Vacant(slot) => {
                    let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                    slot.insert(LiveRecord {
                        seq,
                        record: record.clone(),
                    });
                    return record;
                }
                Entry::Occupied(_) => record.id = self.ids.file_id(),
            }
        }
    }

    fn snapshot(&self, id: &str) -> Option<UploadRecord> {
        self.records.get(id).map(|entry| entry.record.clone())
    }

    // write back only if the id is still live; a deleted id stays deleted
    fn replace_live(&self, record: &UploadRecord) -> bool {
        match self.records.get_mut(&record.id) {
            Some(mut entry) => {
                entry.record = record.clone();
                true
            }
            None => false,
        }
    }

    // merge a terminal record into its stored entry; a deleted entry stays deleted
    fn persist(&self, record: &UploadRecord) {
        if let Err(e) = self.history.update(&record.id, |stored| *stored = record.clone()) {
            tracing::debug!("Not persisting upload {}: {}", record.id, e);
        }
    }

    // store io is blocking, keep it off the runtime workers
    async fn persist_blocking(inner: Arc<Self>, record: UploadRecord) {
        let id = record.id.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || inner.persist(&record)).await {
            tracing::error!("Persisting upload {} failed: {}", id, e);
        }
    }

    async fn drive(self: Arc<Self>, id: String, plan: AttemptPlan) {
        let mut elapsed = Duration::ZERO;
        loop {
            let delay = self.simulator.next_delay();
            self.scheduler.sleep(delay).await;
            elapsed += delay;

            let Some(current) = self.snapshot(&id) else {
                tracing::debug!("Upload {} is gone, dropping its simulator", id);
                return;
            };
            if current.status != UploadStatus::Uploading {
                return;
            }

            let step = self.simulator.step(&current, elapsed, &plan);
            // terminal states hit the store before they show up live
            if step.is_terminal() {
                Inner::persist_blocking(self.clone(), step.record().clone()).await;
            }
            if !self.replace_live(step.record()) {
                tracing::debug!("Upload {} is gone, dropping its simulator", id);
                return;
            }

            match step {
                Step::Progress(record) => {
                    tracing::trace!(
                        "Upload {} at {:.1}% ({:.2} MB/s)",
                        id,
                        record.progress,
                        record.upload_speed
                    );
                }
                Step::Completed(record) => {
                    tracing::info!("✅ Upload completed: {} -> {}", record.name, record.share_link);
                    return;
                }
                Step::Failed(record) => {
                    tracing::warn!("❌ Upload failed: {} ({}) after {:?}", record.name, id, elapsed);
                    return;
                }
            }
        }
    }
}
