//! Synchronization engine
//!
//! Reconciles pending local records against the remote store using the
//! record version as the only conflict signal:
//!
//! - modified records are pushed unless the remote holds a strictly higher
//!   version, in which case they are flagged as conflicts
//! - deleted records are removed remotely, then purged locally
//! - remote records with no local row at all are pulled in as synced
//!
//! Local outcomes are committed in one transaction at the end of the run,
//! guarded by the version each record was read at. Remote writes happen as
//! they go and are not rolled back.

mod report;
mod resolver;


use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::connectivity::ConnectivityProbe;
use crate::db::{LocalBatch, StatusChange};
use crate::error::Result;
use crate::models::{Record, SyncStatus};
use crate::remote::{RemoteSession, RemoteStore};
use crate::services::RecordService;

pub use report::{FailureKind, SyncFailure, SyncOutcome, SyncReport, SyncStage};
pub use resolver::Resolution;

/// Drives sync and conflict resolution for one local store.
///
/// Calls to [`SyncEngine::sync`] and [`SyncEngine::resolve`] are serialized;
/// a second caller waits for the first to finish.
pub struct SyncEngine<R, P> {
    store: RecordService,
    remote: R,
    probe: P,
    guard: Mutex<()>,
}

impl<R, P> SyncEngine<R, P>
where
    R: RemoteStore,
    P: ConnectivityProbe,
{
    pub fn new(store: RecordService, remote: R, probe: P) -> Self {
        Self {
            store,
            remote,
            probe,
            guard: Mutex::new(()),
        }
    }

    /// Local store this engine reconciles
    pub const fn store(&self) -> &RecordService {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Run one sync to completion.
    pub async fn sync(&self) -> Result<SyncReport> {
        self.sync_with_cancel(&CancellationToken::new()).await
    }

    /// Run one sync, stopping between records once `cancel` fires.
    ///
    /// Offline and connection failures come back as report outcomes. Only
    /// local store failures are returned as `Err`.
    pub async fn sync_with_cancel(&self, cancel: &CancellationToken) -> Result<SyncReport> {
        let _guard = self.guard.lock().await;
        let remote_label = self.remote.describe();
        tracing::info!(remote = %remote_label, "Starting sync");

        if !self.probe.is_reachable().await {
            tracing::info!(remote = %remote_label, "Remote unreachable, skipping sync");
            return Ok(SyncReport::new(SyncOutcome::Offline));
        }

        let session = match self.remote.connect().await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(remote = %remote_label, %error, "Remote connection failed");
                return Ok(SyncReport::new(SyncOutcome::ConnectionFailed {
                    message: error.to_string(),
                }));
            }
        };

        let pending = self
            .store
            .list_by_status(&[SyncStatus::Modified, SyncStatus::Deleted])
            .await?;
        tracing::debug!(pending = pending.len(), "Loaded pending local records");

        let mut report = SyncReport::new(SyncOutcome::Completed);
        let mut batch = LocalBatch::default();

        for record in pending {
            if cancel.is_cancelled() {
                break;
            }
            match record.sync_status {
                SyncStatus::Modified => {
                    push_modified(&session, record, &mut batch, &mut report).await;
                }
                SyncStatus::Deleted => {
                    push_deleted(&session, record, &mut batch, &mut report).await;
                }
                SyncStatus::Synced | SyncStatus::Conflict => {}
            }
        }

        if cancel.is_cancelled() {
            tracing::info!("Sync cancelled, committing partial results");
            report.outcome = SyncOutcome::Cancelled;
        } else {
            self.pull_remote_only(&session, &mut batch, &mut report)
                .await?;
        }

        if !batch.is_empty() {
            self.store.apply_batch(&batch).await?;
        }
        drop(session);

        tracing::info!(
            pushed = report.pushed,
            pulled = report.pulled,
            conflicts = report.conflicts,
            purged = report.purged,
            failed = report.failed(),
            "Sync finished"
        );
        Ok(report)
    }

    async fn pull_remote_only<S: RemoteSession>(
        &self,
        session: &S,
        batch: &mut LocalBatch,
        report: &mut SyncReport,
    ) -> Result<()> {
        let scan = match session.fetch_all().await {
            Ok(scan) => scan,
            Err(error) => {
                report.record_failure(None, SyncStage::Pull, &error);
                return Ok(());
            }
        };

        for rejected in scan.rejected {
            report.record_failure(rejected.id, SyncStage::Pull, &rejected.error);
        }

        let local_ids = self.store.list_ids().await?;
        for remote in scan.records {
            if local_ids.contains(&remote.id) {
                continue;
            }
            tracing::debug!(record_id = %remote.id, "Pulling remote-only record");
            batch.pulls.push(remote.into_synced());
            report.pulled += 1;
        }
        Ok(())
    }
}

async fn push_modified<S: RemoteSession>(
    session: &S,
    record: Record,
    batch: &mut LocalBatch,
    report: &mut SyncReport,
) {
    let remote_version = match session.get_version(&record.id).await {
        Ok(version) => version,
        Err(error) => {
            report.record_failure(Some(record.id), SyncStage::VersionCheck, &error);
            return;
        }
    };

    if let Some(remote_version) = remote_version {
        if remote_version > record.version {
            tracing::debug!(
                record_id = %record.id,
                local_version = record.version,
                remote_version,
                "Remote is ahead, flagging conflict"
            );
            batch
                .status_changes
                .push(StatusChange::new(&record, SyncStatus::Conflict));
            report.conflicts += 1;
            return;
        }
    }

    match session.upsert_synced(&record).await {
        Ok(true) => {
            tracing::debug!(record_id = %record.id, version = record.version, "Pushed record");
            batch
                .status_changes
                .push(StatusChange::new(&record, SyncStatus::Synced));
            report.pushed += 1;
        }
        Ok(false) => {
            tracing::debug!(
                record_id = %record.id,
                local_version = record.version,
                "Remote moved ahead during push, flagging conflict"
            );
            batch
                .status_changes
                .push(StatusChange::new(&record, SyncStatus::Conflict));
            report.conflicts += 1;
        }
        Err(error) => {
            report.record_failure(Some(record.id), SyncStage::Push, &error);
        }
    }
}

async fn push_deleted<S: RemoteSession>(
    session: &S,
    record: Record,
    batch: &mut LocalBatch,
    report: &mut SyncReport,
) {
    if let Err(error) = session.delete(&record.id).await {
        report.record_failure(Some(record.id), SyncStage::Delete, &error);
        return;
    }

    tracing::debug!(record_id = %record.id, "Remote delete confirmed, purging tombstone");
    batch.purges.push(record.id);
    report.purged += 1;
}
