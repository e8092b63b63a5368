//! Summary of one sync run

use serde::Serialize;

use crate::error::Error;
use crate::models::RecordId;

/// How a sync run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Connectivity probe said the remote is unreachable; nothing was touched
    Offline,
    /// Probe passed but the remote connection could not be opened
    ConnectionFailed { message: String },
    /// Every pending record and the pull step were processed
    Completed,
    /// Stopped early; outcomes computed so far were committed
    Cancelled,
}

/// Step of the run where a record-level failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    VersionCheck,
    Push,
    Delete,
    Pull,
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::VersionCheck => "version check",
            Self::Push => "push",
            Self::Delete => "delete",
            Self::Pull => "pull",
        };
        f.write_str(label)
    }
}

/// Broad cause of a record-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The remote call exceeded its time budget
    Timeout,
    /// The remote rejected the call or returned something unusable
    Remote,
}

impl FailureKind {
    /// Map an error to its failure kind
    pub const fn classify(error: &Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Remote
        }
    }
}

/// A failure isolated to one record (or to the pull scan when `record_id` is `None`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub record_id: Option<RecordId>,
    pub stage: SyncStage,
    pub kind: FailureKind,
    pub message: String,
}

impl SyncFailure {
    /// Capture `error` for `record_id` at `stage`
    pub fn new(record_id: Option<RecordId>, stage: SyncStage, error: &Error) -> Self {
        Self {
            record_id,
            stage,
            kind: FailureKind::classify(error),
            message: error.to_string(),
        }
    }
}

/// Summary returned by every sync call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Records written to the remote and marked synced locally
    pub pushed: usize,
    /// Remote-only records inserted locally
    pub pulled: usize,
    /// Records newly flagged as conflicts
    pub conflicts: usize,
    /// Tombstones removed after the remote confirmed the delete
    pub purged: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub const fn new(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            pushed: 0,
            pulled: 0,
            conflicts: 0,
            purged: 0,
            failures: Vec::new(),
        }
    }

    /// Whether the run got as far as talking to the remote
    pub const fn attempted(&self) -> bool {
        matches!(
            self.outcome,
            SyncOutcome::Completed | SyncOutcome::Cancelled
        )
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when the run changed nothing on either side
    pub fn is_noop(&self) -> bool {
        self.pushed == 0 && self.pulled == 0 && self.conflicts == 0 && self.purged == 0
    }

    pub(crate) fn record_failure(
        &mut self,
        record_id: Option<RecordId>,
        stage: SyncStage,
        error: &Error,
    ) {
        tracing::warn!(
            record_id = record_id.as_ref().map_or("-", RecordId::as_str),
            %stage,
            %error,
            "Sync step failed"
        );
        self.failures.push(SyncFailure::new(record_id, stage, error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn offline_and_connection_failures_are_not_attempts() {
        assert!(!SyncReport::new(SyncOutcome::Offline).attempted());
        assert!(!SyncReport::new(SyncOutcome::ConnectionFailed {
            message: "refused".into()
        })
        .attempted());
        assert!(SyncReport::new(SyncOutcome::Completed).attempted());
        assert!(SyncReport::new(SyncOutcome::Cancelled).attempted());
    }

    #[test]
    fn failure_kind_follows_error() {
        let timeout = Error::Timeout {
            operation: "get_version",
            after: Duration::from_secs(1),
        };
        assert_eq!(FailureKind::classify(&timeout), FailureKind::Timeout);
        assert_eq!(
            FailureKind::classify(&Error::Database("constraint".into())),
            FailureKind::Remote
        );
    }

    #[test]
    fn report_serializes_with_tagged_outcome() {
        let mut report = SyncReport::new(SyncOutcome::Completed);
        report.pushed = 2;
        report.record_failure(
            Some("a".parse().unwrap()),
            SyncStage::Push,
            &Error::Database("boom".into()),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "completed");
        assert_eq!(json["pushed"], 2);
        assert_eq!(json["failures"][0]["record_id"], "a");
        assert_eq!(json["failures"][0]["stage"], "push");
        assert_eq!(json["failures"][0]["kind"], "remote");
        assert_eq!(report.failed(), 1);
        assert!(!report.is_noop());
    }
}
