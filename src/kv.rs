use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::error::KvError;

/// the local key-value store the history lives in. values are opaque strings,
/// parsing is the caller's business.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
}

/// one file per key under a data directory, with a total byte quota
/// across all keys (like a browser profile's storage budget)
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
    quota: usize,
}

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>, quota: usize) -> Self {
        Self {
            dir: dir.into(),
            quota,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keys are fixed identifiers, but keep anything path-like out anyway
        let safe: String = key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    // bytes held by every key except the one being replaced
    fn used_by_others(&self, target: &Path) -> Result<usize, KvError> {
        let mut used = 0usize;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path() == target {
                continue;
            }
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                used += metadata.len() as usize;
            }
        }
        Ok(used)
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let needed = self.used_by_others(&path)? + value.len();
        if needed > self.quota {
            return Err(KvError::QuotaExceeded {
                needed,
                quota: self.quota,
            });
        }

        tracing::trace!("Writing {} bytes to {:?}", value.len(), path);
        std::fs::write(&path, value)?;
        Ok(())
    }
}

/// in-process store, handy for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: DashMap::new(),
            quota: Some(quota),
        }
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        if let Some(quota) = self.quota {
            let others: usize = self
                .entries
                .iter()
                .filter(|e| e.key() != key)
                .map(|e| e.value().len())
                .sum();
            let needed = others + value.len();
            if needed > quota {
                return Err(KvError::QuotaExceeded { needed, quota });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
