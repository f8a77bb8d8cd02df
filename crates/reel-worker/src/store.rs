//! Registry of finished outputs with expiry.
//!
//! Pipelines never depend on it; the context registers each delivered file
//! when a store is attached, and [`sweep_expired`] deletes what has aged out.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};

/// One delivered artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub key: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OutputRecord {
    pub fn new(key: impl Into<String>, path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            key: key.into(),
            path: path.into(),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Key → record storage.
pub trait OutputStore: Send + Sync {
    /// Insert or replace the record for `record.key`.
    fn register(&self, record: OutputRecord) -> WorkerResult<()>;

    fn get(&self, key: &str) -> WorkerResult<Option<OutputRecord>>;

    fn remove(&self, key: &str) -> WorkerResult<Option<OutputRecord>>;

    /// Records whose expiry is at or before `now`.
    fn expired(&self, now: DateTime<Utc>) -> WorkerResult<Vec<OutputRecord>>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryOutputStore {
    records: RwLock<HashMap<String, OutputRecord>>,
}

impl InMemoryOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> WorkerError {
    WorkerError::store("output registry lock poisoned")
}

impl OutputStore for InMemoryOutputStore {
    fn register(&self, record: OutputRecord) -> WorkerResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(record.key.clone(), record);
        Ok(())
    }

    fn get(&self, key: &str) -> WorkerResult<Option<OutputRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(key).cloned())
    }

    fn remove(&self, key: &str) -> WorkerResult<Option<OutputRecord>> {
        let mut records = self.records.write().map_err(poisoned)?;
        Ok(records.remove(key))
    }

    fn expired(&self, now: DateTime<Utc>) -> WorkerResult<Vec<OutputRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut expired: Vec<_> = records
            .values()
            .filter(|r| r.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        Ok(expired)
    }
}

/// Delete every expired artifact and drop its record. Returns the number swept.
///
/// A file that is already gone still counts; a file that cannot be removed
/// keeps its record so the next sweep retries it.
pub async fn sweep_expired(store: &dyn OutputStore, now: DateTime<Utc>) -> WorkerResult<usize> {
    let mut swept = 0;
    for record in store.expired(now)? {
        match tokio::fs::remove_file(&record.path).await {
            Ok(()) => debug!(path = %record.path.display(), "Removed expired output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %record.path.display(), error = %e, "Could not remove expired output");
                continue;
            }
        }
        store.remove(&record.key)?;
        swept += 1;
    }
    if swept > 0 {
        info!(swept, "Swept expired outputs");
    }
    Ok(swept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_register_and_replace() {
        let store = InMemoryOutputStore::new();
        store
            .register(OutputRecord::new("a", "/out/a.mp4", Duration::hours(1)))
            .unwrap();
        store
            .register(OutputRecord::new("a", "/out/a2.mp4", Duration::hours(1)))
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().unwrap().path, PathBuf::from("/out/a2.mp4"));
        assert!(store.get("b").unwrap().is_none());
    }

    #[test]
    fn test_expired_filter() {
        let store = InMemoryOutputStore::new();
        store
            .register(OutputRecord::new("old", "/o", Duration::seconds(-5)))
            .unwrap();
        store
            .register(OutputRecord::new("new", "/n", Duration::hours(2)))
            .unwrap();

        let expired = store.expired(Utc::now()).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].key, "old");
    }

    #[tokio::test]
    async fn test_sweep_removes_files_and_records() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("stale.mp4");
        let fresh = dir.path().join("fresh.mp4");
        tokio::fs::write(&stale, b"x").await.unwrap();
        tokio::fs::write(&fresh, b"y").await.unwrap();

        let store = InMemoryOutputStore::new();
        store
            .register(OutputRecord::new("stale", &stale, Duration::minutes(-1)))
            .unwrap();
        store
            .register(OutputRecord::new("fresh", &fresh, Duration::hours(1)))
            .unwrap();
        store
            .register(OutputRecord::new("gone", dir.path().join("gone.mp4"), Duration::minutes(-1)))
            .unwrap();

        let swept = sweep_expired(&store, Utc::now()).await.unwrap();
        assert_eq!(swept, 2);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh").unwrap().is_some());
    }
}
