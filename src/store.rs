use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::UploadError;
use crate::kv::KvStore;
use crate::models::{Session, UploadRecord};

/// key holding the upload history array
pub const HISTORY_KEY: &str = "dropzone_upload_history";
/// key holding published sessions
pub const SESSIONS_KEY: &str = "dropzone_upload_sessions";

/// a whole-collection JSON blob under one key.
///
/// `load` and `save` never fail: unreadable or corrupt blobs read as empty and
/// write failures are logged and dropped. Read-modify-write helpers hold a
/// single writer lock, so concurrent callers are serialized instead of
/// overwriting each other's snapshot.
pub struct JsonCollection<T> {
    kv: Arc<dyn KvStore>,
    key: &'static str,
    writer: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(kv: Arc<dyn KvStore>, key: &'static str) -> Self {
        Self {
            kv,
            key,
            writer: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn load(&self) -> Vec<T> {
        let raw = match self.kv.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Error reading {}: {}", self.key, e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding unparsable {} ({} bytes): {}", self.key, raw.len(), e);
            Vec::new()
        })
    }

    /// replaces the stored collection. callers must not assume this stuck.
    pub fn save(&self, items: &[T]) {
        let raw = match serde_json::to_string(items) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error serializing {}: {}", self.key, e);
                return;
            }
        };

        if let Err(e) = self.kv.set(self.key, &raw) {
            tracing::error!("Error saving {}: {}", self.key, e);
        } else {
            tracing::trace!("Saved {} items to {}", items.len(), self.key);
        }
    }

    /// run `f` against the latest snapshot and persist the result
    pub fn modify<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        let _guard = self.lock();
        let mut items = self.load();
        let out = f(&mut items);
        self.save(&items);
        out
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // the guard protects no data, a poisoned lock is still usable
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub type HistoryStore = JsonCollection<UploadRecord>;
pub type SessionStore = JsonCollection<Session>;

impl JsonCollection<UploadRecord> {
    pub fn history(kv: Arc<dyn KvStore>) -> Self {
        Self::new(kv, HISTORY_KEY)
    }

    /// append or replace by id
    pub fn upsert(&self, record: &UploadRecord) {
        self.modify(|records| upsert_record(records, record));
    }

    /// merge `f` into the stored record, which must already exist
    pub fn update(
        &self,
        id: &str,
        f: impl FnOnce(&mut UploadRecord),
    ) -> Result<UploadRecord, UploadError> {
        let _guard = self.lock();
        let mut records = self.load();
        let stored = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| UploadError::NotFound(id.to_string()))?;
        f(stored);
        let updated = stored.clone();
        self.save(&records);
        Ok(updated)
    }

    pub fn remove(&self, id: &str) -> Result<(), UploadError> {
        let _guard = self.lock();
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(UploadError::NotFound(id.to_string()));
        }
        self.save(&records);
        Ok(())
    }
}

/// last writer wins per id, new ids go to the end
pub fn upsert_record(records: &mut Vec<UploadRecord>, record: &UploadRecord) {
    match records.iter_mut().find(|r| r.id == record.id) {
        Some(existing) => *existing = record.clone(),
        None => records.push(record.clone()),
    }
}

impl JsonCollection<Session> {
    pub fn sessions(kv: Arc<dyn KvStore>) -> Self {
        Self::new(kv, SESSIONS_KEY)
    }

    pub fn find(&self, session_id: &str) -> Option<Session> {
        self.load().into_iter().find(|s| s.session_id == session_id)
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.modify(|sessions| {
            let before = sessions.len();
            sessions.retain(|s| s.session_id != session_id);
            sessions.len() != before
        })
    }
}
