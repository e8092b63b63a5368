//! Shared local store handle used by the sync engine and clients.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, LibSqlRecordRepository, LocalBatch, RecordRepository};
use crate::models::{Record, RecordId, SyncStatus};
use crate::Result;

/// Thread-safe service for local record operations.
///
/// Each call holds the database lock for exactly one repository operation.
/// Sequences of calls are not atomic with respect to each other.
#[derive(Clone)]
pub struct RecordService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl RecordService {
    /// Open the local store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::debug!("Opening local store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory local store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location of the store, if file-backed.
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Create a new record.
    pub async fn add_record(&self, name: &str, description: &str) -> Result<Record> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.add(name, description).await
    }

    /// Insert a fully formed record (fails on duplicate id).
    pub async fn insert_record(&self, record: &Record) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.insert(record).await
    }

    /// Fetch a record by id, tombstones included.
    pub async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.get(id).await
    }

    /// Whether a record with this id exists locally in any state.
    pub async fn record_exists(&self, id: &RecordId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.exists(id).await
    }

    /// Edit a record. `None` means nothing was changed.
    pub async fn update_record(
        &self,
        id: &RecordId,
        name: &str,
        description: &str,
    ) -> Result<Option<Record>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.update(id, name, description).await
    }

    /// Mark a record deleted. `false` means nothing was changed.
    pub async fn delete_record(&self, id: &RecordId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.delete(id).await
    }

    /// List non-deleted records, most recently updated first.
    pub async fn list_active(&self) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list_active().await
    }

    /// List records in any of the given states.
    pub async fn list_by_status(&self, statuses: &[SyncStatus]) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list_by_status(statuses).await
    }

    /// Every local id, tombstones included.
    pub async fn list_ids(&self) -> Result<HashSet<RecordId>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list_ids().await
    }

    /// IDs starting with `prefix`.
    pub async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.list_ids_by_prefix(prefix, limit).await
    }

    /// Write a record back by id.
    pub async fn upsert_record(&self, record: &Record) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.upsert(record).await
    }

    /// Apply a sync batch in one local transaction.
    pub async fn apply_batch(&self, batch: &LocalBatch) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        repo.apply_batch(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_add_and_list_roundtrip() {
        let service = RecordService::open_in_memory().await.unwrap();

        service.add_record("hello", "core").await.unwrap();
        let records = service.list_active().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "hello");
        assert!(service.db_path().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("dir").join("local.db");

        let service = RecordService::open_path(&db_path).await.unwrap();
        let record = service.add_record("persisted", "").await.unwrap();
        drop(service);

        let reopened = RecordService::open_path(&db_path).await.unwrap();
        assert!(reopened.record_exists(&record.id).await.unwrap());
        assert_eq!(reopened.db_path(), Some(&db_path));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clones_share_the_same_store() {
        let service = RecordService::open_in_memory().await.unwrap();
        let clone = service.clone();

        let record = service.add_record("shared", "").await.unwrap();
        assert!(clone.delete_record(&record.id).await.unwrap());
        assert!(service.list_active().await.unwrap().is_empty());
    }
}
