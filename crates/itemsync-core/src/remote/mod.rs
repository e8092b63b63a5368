//! Remote record store
//!
//! The sync engine talks to the authoritative store through [`RemoteStore`],
//! which opens one [`RemoteSession`] per sync or resolve call. The session is
//! dropped when the call returns, on every path.

mod libsql_remote;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Record, RecordId, SyncStatus};

pub use libsql_remote::{LibSqlRemote, LibSqlSession};

/// A row as stored on the remote side.
///
/// The remote has no notion of local status; everything it holds is synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub version: i64,
}

impl RemoteRecord {
    /// Local copy of this row, marked synced
    #[must_use]
    pub fn into_synced(self) -> Record {
        Record {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
            sync_status: SyncStatus::Synced,
        }
    }
}

impl From<&Record> for RemoteRecord {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
        }
    }
}

/// Every remote row, split into the ones that decoded and the ones that did not
#[derive(Debug, Default)]
pub struct RemoteScan {
    pub records: Vec<RemoteRecord>,
    pub rejected: Vec<RejectedRow>,
}

/// A remote row that could not be turned into a [`RemoteRecord`]
#[derive(Debug)]
pub struct RejectedRow {
    /// Raw id of the row, when it was readable and non-empty
    pub id: Option<RecordId>,
    pub error: Error,
}

/// Something the engine can open a remote session against
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    type Session: RemoteSession;

    /// Connect and make sure the remote schema exists
    async fn connect(&self) -> Result<Self::Session>;

    /// Label for logs (must not contain credentials)
    fn describe(&self) -> String;
}

/// Operations available on an open remote connection
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    /// Stored version for `id`, `None` when absent
    async fn get_version(&self, id: &RecordId) -> Result<Option<i64>>;

    /// Full row for `id`, `None` when absent
    async fn get(&self, id: &RecordId) -> Result<Option<RemoteRecord>>;

    /// Atomic insert-or-update, status forced to synced.
    ///
    /// An existing row is only replaced when its version is not higher than
    /// `record.version`. Returns `false` when the remote kept its own row.
    async fn upsert_synced(&self, record: &Record) -> Result<bool>;

    /// Remove `id`; absent rows are not an error
    async fn delete(&self, id: &RecordId) -> Result<()>;

    /// Every row on the remote. Undecodable rows are returned in
    /// [`RemoteScan::rejected`] instead of failing the scan.
    async fn fetch_all(&self) -> Result<RemoteScan>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_synced_keeps_fields_and_marks_synced() {
        let remote = RemoteRecord {
            id: "X".parse().unwrap(),
            name: "remote".to_string(),
            description: "from elsewhere".to_string(),
            created_at: 10,
            updated_at: 20,
            version: 4,
        };

        let record = remote.clone().into_synced();
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert_eq!(RemoteRecord::from(&record), remote);
    }
}
