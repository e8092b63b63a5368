//! Record repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::{Record, RecordId, SyncStatus};
use crate::util::now_millis;
use libsql::{params, Connection};

const RECORD_COLUMNS: &str =
    "id, name, description, created_at, updated_at, version, sync_status";

/// Status transition for a record that was read at `version` in state `from`.
///
/// Applied only if the row still matches, so a record edited or deleted while
/// the sync was talking to the remote keeps the newer local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: RecordId,
    pub version: i64,
    pub from: SyncStatus,
    pub to: SyncStatus,
}

impl StatusChange {
    #[must_use]
    pub fn new(record: &Record, to: SyncStatus) -> Self {
        Self {
            id: record.id.clone(),
            version: record.version,
            from: record.sync_status,
            to,
        }
    }
}

/// Local writes computed by one sync run, applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalBatch {
    /// Guarded status transitions for pushed or conflicting records
    pub status_changes: Vec<StatusChange>,
    /// Remote-only records; skipped if the id appeared locally meanwhile
    pub pulls: Vec<Record>,
    /// Tombstones whose remote delete was confirmed
    pub purges: Vec<RecordId>,
}

impl LocalBatch {
    /// Whether the batch has nothing to write
    pub fn is_empty(&self) -> bool {
        self.status_changes.is_empty() && self.pulls.is_empty() && self.purges.is_empty()
    }
}

/// Escape `LIKE` wildcards so `prefix` matches literally (used with `ESCAPE '\'`)
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Trait for local record storage operations (async)
///
/// Mutations on a missing id are silent no-ops; the return value tells the
/// caller whether anything changed.
#[allow(async_fn_in_trait)]
pub trait RecordRepository {
    /// Create a new record (version 1, modified)
    async fn add(&self, name: &str, description: &str) -> Result<Record>;

    /// Insert a fully formed record; fails if the id already exists
    async fn insert(&self, record: &Record) -> Result<()>;

    /// Get a record by ID, tombstones included
    async fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Check whether any record (tombstones included) has this ID
    async fn exists(&self, id: &RecordId) -> Result<bool>;

    /// Overwrite name/description and bump the version.
    ///
    /// Returns `None` when the id is unknown or the record is a tombstone.
    async fn update(&self, id: &RecordId, name: &str, description: &str)
        -> Result<Option<Record>>;

    /// Mark a record deleted. Returns `false` when nothing changed.
    async fn delete(&self, id: &RecordId) -> Result<bool>;

    /// List records that are not tombstones, most recently updated first
    async fn list_active(&self) -> Result<Vec<Record>>;

    /// List records in any of the given states, oldest first
    async fn list_by_status(&self, statuses: &[SyncStatus]) -> Result<Vec<Record>>;

    /// Every id held locally, tombstones included
    async fn list_ids(&self) -> Result<HashSet<RecordId>>;

    /// IDs starting with `prefix`, most recently updated first
    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;

    /// Overwrite by id if present, insert otherwise
    async fn upsert(&self, record: &Record) -> Result<()>;

    /// Permanently remove a record. Returns `false` if it was absent.
    async fn purge(&self, id: &RecordId) -> Result<bool>;

    /// Apply status changes, pulls and purges in a single transaction
    async fn apply_batch(&self, batch: &LocalBatch) -> Result<()>;
}

/// libSQL implementation of `RecordRepository`
pub struct LibSqlRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &libsql::Row) -> Result<Record> {
        let id: String = row.get(0)?;
        let status: String = row.get(6)?;
        let sync_status = status.parse::<SyncStatus>().map_err(|_| {
            Error::Database(format!("record {id} has unknown sync_status '{status}'"))
        })?;

        Ok(Record {
            id: RecordId::from_stored(id)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            version: row.get(5)?,
            sync_status,
        })
    }

    async fn query_records(&self, sql: &str) -> Result<Vec<Record>> {
        let mut rows = self.conn.query(sql, ()).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::parse_record(&row)?);
        }
        Ok(records)
    }

    async fn upsert_row(&self, record: &Record) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO items (id, name, description, created_at, updated_at, version, sync_status)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at,
                    version = excluded.version,
                    sync_status = excluded.sync_status",
                params![
                    record.id.as_str(),
                    record.name.as_str(),
                    record.description.as_str(),
                    record.created_at,
                    record.updated_at,
                    record.version,
                    record.sync_status.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    async fn purge_row(&self, id: &RecordId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM items WHERE id = ?", params![id.as_str()])
            .await?;
        Ok(rows > 0)
    }

    async fn write_batch(&self, batch: &LocalBatch) -> Result<()> {
        for change in &batch.status_changes {
            let rows = self
                .conn
                .execute(
                    "UPDATE items SET sync_status = ?
                     WHERE id = ? AND version = ? AND sync_status = ?",
                    params![
                        change.to.as_str(),
                        change.id.as_str(),
                        change.version,
                        change.from.as_str()
                    ],
                )
                .await?;
            if rows == 0 {
                tracing::debug!(
                    record_id = %change.id,
                    "Status change skipped: record changed during sync"
                );
            }
        }
        for record in &batch.pulls {
            self.conn
                .execute(
                    "INSERT INTO items (id, name, description, created_at, updated_at, version, sync_status)
                     VALUES (?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO NOTHING",
                    params![
                        record.id.as_str(),
                        record.name.as_str(),
                        record.description.as_str(),
                        record.created_at,
                        record.updated_at,
                        record.version,
                        record.sync_status.as_str()
                    ],
                )
                .await?;
        }
        for id in &batch.purges {
            let rows = self
                .conn
                .execute(
                    "DELETE FROM items WHERE id = ? AND sync_status = 'deleted'",
                    params![id.as_str()],
                )
                .await?;
            if rows == 0 {
                tracing::debug!(record_id = %id, "Purge skipped: tombstone no longer present");
            }
        }
        Ok(())
    }
}

impl RecordRepository for LibSqlRecordRepository<'_> {
    async fn add(&self, name: &str, description: &str) -> Result<Record> {
        let record = Record::new(name, description);
        self.insert(&record).await?;
        Ok(record)
    }

    async fn insert(&self, record: &Record) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO items (id, name, description, created_at, updated_at, version, sync_status)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.id.as_str(),
                    record.name.as_str(),
                    record.description.as_str(),
                    record.created_at,
                    record.updated_at,
                    record.version,
                    record.sync_status.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM items WHERE id = ?"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn exists(&self, id: &RecordId) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?)",
                params![id.as_str()],
            )
            .await?;

        Ok(match rows.next().await? {
            Some(row) => row.get::<i32>(0)? != 0,
            None => false,
        })
    }

    async fn update(
        &self,
        id: &RecordId,
        name: &str,
        description: &str,
    ) -> Result<Option<Record>> {
        let now = now_millis();

        let rows = self
            .conn
            .execute(
                "UPDATE items
                 SET name = ?, description = ?, version = version + 1,
                     sync_status = 'modified', updated_at = MAX(updated_at, ?)
                 WHERE id = ? AND sync_status != 'deleted'",
                params![name, description, now, id.as_str()],
            )
            .await?;

        if rows == 0 {
            tracing::debug!(record_id = %id, "update skipped: record missing or deleted");
            return Ok(None);
        }

        self.get(id).await
    }

    async fn delete(&self, id: &RecordId) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE items SET sync_status = 'deleted'
                 WHERE id = ? AND sync_status != 'deleted'",
                params![id.as_str()],
            )
            .await?;

        if rows == 0 {
            tracing::debug!(record_id = %id, "delete skipped: record missing or already deleted");
        }
        Ok(rows > 0)
    }

    async fn list_active(&self) -> Result<Vec<Record>> {
        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS}
             FROM items
             WHERE sync_status != 'deleted'
             ORDER BY updated_at DESC, id ASC"
        ))
        .await
    }

    async fn list_by_status(&self, statuses: &[SyncStatus]) -> Result<Vec<Record>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        // Status strings come from a closed enum, so inlining them is safe
        let in_list = statuses
            .iter()
            .map(|status| format!("'{}'", status.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        self.query_records(&format!(
            "SELECT {RECORD_COLUMNS}
             FROM items
             WHERE sync_status IN ({in_list})
             ORDER BY created_at ASC, id ASC"
        ))
        .await
    }

    async fn list_ids(&self) -> Result<HashSet<RecordId>> {
        let mut rows = self.conn.query("SELECT id FROM items", ()).await?;
        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            ids.insert(RecordId::from_stored(id)?);
        }
        Ok(ids)
    }

    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id
                 FROM items
                 WHERE id LIKE ? ESCAPE '\\'
                 ORDER BY updated_at DESC
                 LIMIT ?",
                params![format!("{}%", escape_like(prefix)), limit as i64],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    async fn upsert(&self, record: &Record) -> Result<()> {
        self.upsert_row(record).await
    }

    async fn purge(&self, id: &RecordId) -> Result<bool> {
        self.purge_row(id).await
    }

    async fn apply_batch(&self, batch: &LocalBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        if let Err(e) = self.write_batch(batch).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e);
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        tracing::debug!(
            status_changes = batch.status_changes.len(),
            pulls = batch.pulls.len(),
            purges = batch.purges.len(),
            "Applied local sync batch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn fixed_record(id: &str, status: SyncStatus) -> Record {
        Record {
            id: id.parse().unwrap(),
            name: format!("name-{id}"),
            description: format!("desc-{id}"),
            created_at: 1000,
            updated_at: 1000,
            version: 1,
            sync_status: status,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_and_get() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let record = repo.add("A", "d1").await.unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.sync_status, SyncStatus::Modified);

        let fetched = repo.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_increments_version_by_one() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let record = repo.add("A", "d1").await.unwrap();
        let first = repo.update(&record.id, "A2", "d2").await.unwrap().unwrap();
        let second = repo.update(&record.id, "A3", "d3").await.unwrap().unwrap();

        assert_eq!(first.version, 2);
        assert_eq!(second.version, 3);
        assert_eq!(second.name, "A3");
        assert_eq!(second.sync_status, SyncStatus::Modified);
        assert!(second.updated_at >= record.updated_at);
        assert_eq!(second.created_at, record.created_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_resets_synced_to_modified() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        repo.insert(&fixed_record("s1", SyncStatus::Synced))
            .await
            .unwrap();
        let updated = repo
            .update(&"s1".parse().unwrap(), "n", "d")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.sync_status, SyncStatus::Modified);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_or_deleted_is_noop() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let missing = repo
            .update(&"nope".parse().unwrap(), "x", "y")
            .await
            .unwrap();
        assert!(missing.is_none());

        let record = repo.add("A", "d1").await.unwrap();
        assert!(repo.delete(&record.id).await.unwrap());
        assert!(repo.update(&record.id, "B", "x").await.unwrap().is_none());

        let tombstone = repo.get(&record.id).await.unwrap().unwrap();
        assert_eq!(tombstone.name, "A");
        assert_eq!(tombstone.version, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_hides_from_active_but_keeps_tombstone() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let keep = repo.add("keep", "").await.unwrap();
        let gone = repo.add("gone", "").await.unwrap();
        assert!(repo.delete(&gone.id).await.unwrap());
        assert!(!repo.delete(&gone.id).await.unwrap());
        assert!(!repo.delete(&"missing".parse().unwrap()).await.unwrap());

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);

        let tombstone = repo.get(&gone.id).await.unwrap().unwrap();
        assert_eq!(tombstone.sync_status, SyncStatus::Deleted);
        assert_eq!(tombstone.version, 1);
        assert!(repo.exists(&gone.id).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_status_filters() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        for (id, status) in [
            ("a", SyncStatus::Synced),
            ("b", SyncStatus::Modified),
            ("c", SyncStatus::Deleted),
            ("d", SyncStatus::Conflict),
        ] {
            repo.insert(&fixed_record(id, status)).await.unwrap();
        }

        let pending = repo
            .list_by_status(&[SyncStatus::Modified, SyncStatus::Deleted])
            .await
            .unwrap();
        let ids = pending
            .iter()
            .map(|record| record.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "c"]);

        assert!(repo.list_by_status(&[]).await.unwrap().is_empty());
        assert_eq!(repo.list_ids().await.unwrap().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_inserts_then_overwrites() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let mut record = fixed_record("u1", SyncStatus::Synced);
        repo.upsert(&record).await.unwrap();

        record.name = "renamed".to_string();
        record.version = 7;
        record.sync_status = SyncStatus::Conflict;
        repo.upsert(&record).await.unwrap();

        let fetched = repo.get(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched, record);
        assert_eq!(repo.list_ids().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_rejects_duplicate_id() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let record = fixed_record("dup", SyncStatus::Synced);
        repo.insert(&record).await.unwrap();
        assert!(repo.insert(&record).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_apply_batch_changes_status_pulls_and_purges() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let tombstone = fixed_record("old", SyncStatus::Deleted);
        repo.insert(&tombstone).await.unwrap();
        let pushed = fixed_record("p", SyncStatus::Modified);
        repo.insert(&pushed).await.unwrap();

        let batch = LocalBatch {
            status_changes: vec![StatusChange::new(&pushed, SyncStatus::Synced)],
            pulls: vec![fixed_record("pulled", SyncStatus::Synced)],
            purges: vec![tombstone.id.clone()],
        };
        repo.apply_batch(&batch).await.unwrap();

        assert!(!repo.exists(&tombstone.id).await.unwrap());
        assert_eq!(
            repo.get(&pushed.id).await.unwrap().unwrap().sync_status,
            SyncStatus::Synced
        );
        assert!(repo.exists(&"pulled".parse().unwrap()).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_apply_batch_keeps_rows_changed_after_snapshot() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        let edited = fixed_record("edited", SyncStatus::Modified);
        repo.insert(&edited).await.unwrap();
        let deleted = fixed_record("deleted", SyncStatus::Modified);
        repo.insert(&deleted).await.unwrap();
        let local = fixed_record("local", SyncStatus::Modified);
        repo.insert(&local).await.unwrap();
        let revived = fixed_record("revived", SyncStatus::Deleted);
        repo.insert(&revived).await.unwrap();

        let batch = LocalBatch {
            status_changes: vec![
                StatusChange::new(&edited, SyncStatus::Synced),
                StatusChange::new(&deleted, SyncStatus::Synced),
            ],
            pulls: vec![fixed_record("local", SyncStatus::Synced)],
            purges: vec![revived.id.clone()],
        };

        // Local writes racing the remote round trips
        repo.update(&edited.id, "newer", "edit").await.unwrap().unwrap();
        assert!(repo.delete(&deleted.id).await.unwrap());
        repo.upsert(&fixed_record("revived", SyncStatus::Modified))
            .await
            .unwrap();

        repo.apply_batch(&batch).await.unwrap();

        let edited_now = repo.get(&edited.id).await.unwrap().unwrap();
        assert_eq!(edited_now.version, 2);
        assert_eq!(edited_now.sync_status, SyncStatus::Modified);
        assert_eq!(
            repo.get(&deleted.id).await.unwrap().unwrap().sync_status,
            SyncStatus::Deleted
        );
        assert_eq!(
            repo.get(&local.id).await.unwrap().unwrap().sync_status,
            SyncStatus::Modified
        );
        assert_eq!(
            repo.get(&revived.id).await.unwrap().unwrap().sync_status,
            SyncStatus::Modified
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_purge_missing_returns_false() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());
        assert!(!repo.purge(&"missing".parse().unwrap()).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_ids_by_prefix() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        repo.insert(&fixed_record("abc-1", SyncStatus::Synced))
            .await
            .unwrap();
        repo.insert(&fixed_record("abc-2", SyncStatus::Synced))
            .await
            .unwrap();
        repo.insert(&fixed_record("xyz", SyncStatus::Synced))
            .await
            .unwrap();

        assert_eq!(repo.list_ids_by_prefix("abc", 5).await.unwrap().len(), 2);
        assert_eq!(repo.list_ids_by_prefix("abc", 1).await.unwrap().len(), 1);
        assert_eq!(repo.list_ids_by_prefix("xy", 5).await.unwrap(), vec!["xyz"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_ids_by_prefix_treats_wildcards_literally() {
        let db = setup().await;
        let repo = LibSqlRecordRepository::new(db.connection());

        for id in ["a_1", "ab1", "a%b", "aXb", "a\\c"] {
            repo.insert(&fixed_record(id, SyncStatus::Synced))
                .await
                .unwrap();
        }

        assert_eq!(repo.list_ids_by_prefix("a_", 5).await.unwrap(), vec!["a_1"]);
        assert_eq!(repo.list_ids_by_prefix("a%", 5).await.unwrap(), vec!["a%b"]);
        assert_eq!(repo.list_ids_by_prefix("a\\", 5).await.unwrap(), vec!["a\\c"]);
    }
}
