//! Conflict resolution for records the sync engine flagged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SyncEngine;
use crate::connectivity::ConnectivityProbe;
use crate::error::{Error, Result};
use crate::models::{RecordId, SyncStatus};
use crate::remote::{RemoteSession, RemoteStore};

/// Which side wins a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep the local content; it is pushed on the next sync
    #[serde(rename = "local")]
    KeepLocal,
    /// Replace the local content with the remote row
    #[serde(rename = "remote")]
    KeepRemote,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepLocal => f.write_str("local"),
            Self::KeepRemote => f.write_str("remote"),
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::KeepLocal),
            "remote" => Ok(Self::KeepRemote),
            other => Err(Error::InvalidInput(format!(
                "Unknown resolution '{other}', expected 'local' or 'remote'"
            ))),
        }
    }
}

impl<R, P> SyncEngine<R, P>
where
    R: RemoteStore,
    P: ConnectivityProbe,
{
    /// Apply a resolution to a conflicted record.
    ///
    /// Missing records and records not in conflict are left alone and
    /// reported as success.
    pub async fn resolve(&self, id: &RecordId, resolution: Resolution) -> Result<()> {
        let _guard = self.guard.lock().await;

        let Some(mut record) = self.store.get_record(id).await? else {
            tracing::debug!(record_id = %id, "Resolve skipped, record not found");
            return Ok(());
        };
        if record.sync_status != SyncStatus::Conflict {
            tracing::debug!(
                record_id = %id,
                status = %record.sync_status,
                "Resolve skipped, record not in conflict"
            );
            return Ok(());
        }

        match resolution {
            Resolution::KeepLocal => {
                record.sync_status = SyncStatus::Modified;
                self.store.upsert_record(&record).await?;
            }
            Resolution::KeepRemote => {
                if !self.probe.is_reachable().await {
                    return Err(Error::Offline);
                }
                let session = self.remote.connect().await?;
                let remote = session
                    .get(id)
                    .await?
                    .ok_or_else(|| Error::RemoteRecordGone(id.to_string()))?;
                drop(session);
                self.store.upsert_record(&remote.into_synced()).await?;
            }
        }

        tracing::info!(record_id = %id, %resolution, "Resolved conflict");
        Ok(())
    }
}
