//! libSQL remote adapter (Turso, sqld, or a shared database file)

use std::future::Future;
use std::time::Duration;

use libsql::{params, Builder, Connection, Database as LibSqlDatabase};

use super::{RejectedRow, RemoteRecord, RemoteScan, RemoteSession, RemoteStore};
use crate::config::{RemoteTarget, SyncConfig, DEFAULT_REMOTE_TIMEOUT};
use crate::db::CREATE_ITEMS_TABLE;
use crate::error::{Error, Result};
use crate::models::{Record, RecordId};

/// Remote store reachable through libSQL
#[derive(Debug, Clone)]
pub struct LibSqlRemote {
    target: RemoteTarget,
    timeout: Duration,
}

impl LibSqlRemote {
    /// Create an adapter for an explicit target
    pub const fn new(target: RemoteTarget, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    /// Create an adapter backed by a database file (shared remote)
    pub fn file(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(RemoteTarget::File(path.into()), DEFAULT_REMOTE_TIMEOUT)
    }

    /// Build the adapter from sync configuration
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Ok(Self::new(config.remote_target()?, config.remote_timeout))
    }

    async fn open(&self) -> Result<LibSqlDatabase> {
        let db = match &self.target {
            RemoteTarget::Remote { url, auth_token } => {
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await?
            }
            RemoteTarget::File(path) => Builder::new_local(path).build().await?,
        };
        Ok(db)
    }
}

impl RemoteStore for LibSqlRemote {
    type Session = LibSqlSession;

    async fn connect(&self) -> Result<LibSqlSession> {
        let timeout = self.timeout;
        let connected = timed("connect", timeout, async {
            let db = self.open().await?;
            let conn = db.connect()?;
            conn.execute(CREATE_ITEMS_TABLE, ()).await?;
            Ok((db, conn))
        })
        .await;

        match connected {
            Ok((db, conn)) => {
                tracing::debug!(remote = %self.describe(), "Opened remote session");
                Ok(LibSqlSession {
                    _db: db,
                    conn,
                    timeout,
                })
            }
            Err(error @ Error::Timeout { .. }) => Err(Error::Connection(error.to_string())),
            Err(error) => Err(Error::Connection(format!(
                "{}: {error}",
                self.target.describe()
            ))),
        }
    }

    fn describe(&self) -> String {
        self.target.describe()
    }
}

/// One open connection to the remote store
pub struct LibSqlSession {
    _db: LibSqlDatabase,
    conn: Connection,
    timeout: Duration,
}

impl LibSqlSession {
    fn parse_remote_record(row: &libsql::Row) -> Result<RemoteRecord> {
        let id: String = row.get(0)?;
        Ok(RemoteRecord {
            id: RecordId::from_stored(id)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            version: row.get(5)?,
        })
    }
}

impl RemoteSession for LibSqlSession {
    async fn get_version(&self, id: &RecordId) -> Result<Option<i64>> {
        timed("get_version", self.timeout, async {
            let mut rows = self
                .conn
                .query(
                    "SELECT version FROM items WHERE id = ?",
                    params![id.as_str()],
                )
                .await?;
            match rows.next().await? {
                Some(row) => Ok(Some(row.get::<i64>(0)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn get(&self, id: &RecordId) -> Result<Option<RemoteRecord>> {
        timed("get", self.timeout, async {
            let mut rows = self
                .conn
                .query(
                    "SELECT id, name, description, created_at, updated_at, version
                     FROM items WHERE id = ?",
                    params![id.as_str()],
                )
                .await?;
            match rows.next().await? {
                Some(row) => Ok(Some(Self::parse_remote_record(&row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn upsert_synced(&self, record: &Record) -> Result<bool> {
        timed("upsert_synced", self.timeout, async {
            let rows = self
                .conn
                .execute(
                    "INSERT INTO items (id, name, description, created_at, updated_at, version, sync_status)
                     VALUES (?, ?, ?, ?, ?, ?, 'synced')
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        description = excluded.description,
                        updated_at = excluded.updated_at,
                        version = excluded.version,
                        sync_status = excluded.sync_status
                     WHERE items.version <= excluded.version",
                    params![
                        record.id.as_str(),
                        record.name.as_str(),
                        record.description.as_str(),
                        record.created_at,
                        record.updated_at,
                        record.version
                    ],
                )
                .await?;
            Ok(rows > 0)
        })
        .await
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        timed("delete", self.timeout, async {
            self.conn
                .execute("DELETE FROM items WHERE id = ?", params![id.as_str()])
                .await?;
            Ok(())
        })
        .await
    }

    async fn fetch_all(&self) -> Result<RemoteScan> {
        timed("fetch_all", self.timeout, async {
            let mut rows = self
                .conn
                .query(
                    "SELECT id, name, description, created_at, updated_at, version
                     FROM items
                     ORDER BY created_at ASC, id ASC",
                    (),
                )
                .await?;

            let mut scan = RemoteScan::default();
            while let Some(row) = rows.next().await? {
                match Self::parse_remote_record(&row) {
                    Ok(record) => scan.records.push(record),
                    Err(error) => {
                        let id = row
                            .get::<String>(0)
                            .ok()
                            .and_then(|raw| RecordId::from_stored(raw).ok());
                        scan.rejected.push(RejectedRow { id, error });
                    }
                }
            }
            Ok(scan)
        })
        .await
    }
}

async fn timed<T, F>(operation: &'static str, after: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(after, fut)
        .await
        .unwrap_or(Err(Error::Timeout { operation, after }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn record(id: &str, version: i64) -> Record {
        Record {
            id: id.parse().unwrap(),
            name: format!("name-{id}"),
            description: "desc".to_string(),
            created_at: 100,
            updated_at: 200,
            version,
            sync_status: SyncStatus::Modified,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connect_provisions_schema_and_roundtrips() {
        let tmp = tempdir().unwrap();
        let remote = LibSqlRemote::file(tmp.path().join("remote.db"));
        let session = remote.connect().await.unwrap();

        assert!(session.fetch_all().await.unwrap().records.is_empty());
        assert_eq!(session.get_version(&"a".parse().unwrap()).await.unwrap(), None);

        assert!(session.upsert_synced(&record("a", 1)).await.unwrap());
        assert_eq!(
            session.get_version(&"a".parse().unwrap()).await.unwrap(),
            Some(1)
        );

        let fetched = session.get(&"a".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched, RemoteRecord::from(&record("a", 1)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_overwrites_payload_but_keeps_created_at() {
        let tmp = tempdir().unwrap();
        let remote = LibSqlRemote::file(tmp.path().join("remote.db"));
        let session = remote.connect().await.unwrap();

        session.upsert_synced(&record("a", 1)).await.unwrap();
        let mut newer = record("a", 2);
        newer.name = "renamed".to_string();
        newer.created_at = 999;
        assert!(session.upsert_synced(&newer).await.unwrap());

        let all = session.fetch_all().await.unwrap().records;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "renamed");
        assert_eq!(all[0].version, 2);
        assert_eq!(all[0].created_at, 100);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_forces_synced_status() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("remote.db");
        let remote = LibSqlRemote::file(&path);
        let session = remote.connect().await.unwrap();
        session.upsert_synced(&record("a", 1)).await.unwrap();

        let db = Builder::new_local(&path).build().await.unwrap();
        let conn = db.connect().unwrap();
        let mut rows = conn
            .query("SELECT sync_status FROM items WHERE id = 'a'", ())
            .await
            .unwrap();
        let status: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(status, "synced");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_is_idempotent() {
        let tmp = tempdir().unwrap();
        let remote = LibSqlRemote::file(tmp.path().join("remote.db"));
        let session = remote.connect().await.unwrap();

        session.upsert_synced(&record("a", 1)).await.unwrap();
        session.delete(&"a".parse().unwrap()).await.unwrap();
        session.delete(&"a".parse().unwrap()).await.unwrap();
        assert!(session.fetch_all().await.unwrap().records.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_never_lowers_remote_version() {
        let tmp = tempdir().unwrap();
        let remote = LibSqlRemote::file(tmp.path().join("remote.db"));
        let session = remote.connect().await.unwrap();

        let mut newer = record("a", 5);
        newer.name = "other client".to_string();
        assert!(session.upsert_synced(&newer).await.unwrap());
        assert!(!session.upsert_synced(&record("a", 2)).await.unwrap());
        assert!(session.upsert_synced(&record("a", 5)).await.unwrap());

        let stored = session.get(&"a".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.version, 5);
        assert_eq!(stored.name, "name-a");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_all_sets_aside_undecodable_rows() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("remote.db");
        let remote = LibSqlRemote::file(&path);
        let session = remote.connect().await.unwrap();
        session.upsert_synced(&record("good-1", 1)).await.unwrap();
        session.upsert_synced(&record("good-2", 1)).await.unwrap();

        let db = Builder::new_local(&path).build().await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute(
            "INSERT INTO items (id, name, description, created_at, updated_at, version)
             VALUES ('', 'blank', '', 100, 100, 1),
                    ('blob-name', x'00ff', '', 100, 100, 1)",
            (),
        )
        .await
        .unwrap();

        let scan = session.fetch_all().await.unwrap();
        let good = scan
            .records
            .iter()
            .map(|record| record.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(good, vec!["good-1", "good-2"]);

        let rejected = scan
            .rejected
            .iter()
            .map(|row| row.id.as_ref().map(RecordId::as_str))
            .collect::<Vec<_>>();
        assert_eq!(rejected, vec![None, Some("blob-name")]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ids_are_stored_and_read_back_verbatim() {
        let tmp = tempdir().unwrap();
        let remote = LibSqlRemote::file(tmp.path().join("remote.db"));
        let session = remote.connect().await.unwrap();

        let mut padded = record("a", 1);
        padded.id = RecordId::from_stored(" X ".to_string()).unwrap();
        session.upsert_synced(&padded).await.unwrap();

        let scan = session.fetch_all().await.unwrap();
        assert_eq!(scan.records[0].id.as_str(), " X ");
        assert!(session.get(&padded.id).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connect_failure_maps_to_connection_error() {
        let tmp = tempdir().unwrap();
        let remote = LibSqlRemote::file(tmp.path().join("missing-dir").join("remote.db"));

        let error = remote.connect().await.err().unwrap();
        assert!(matches!(error, Error::Connection(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timed_reports_elapsed_budget() {
        let result: Result<()> = timed("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let error = result.unwrap_err();
        assert!(error.is_timeout());
        assert!(error.to_string().contains("slow"));
    }
}
