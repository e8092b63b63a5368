//! Record model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::util::now_millis;

/// Identifier shared by the local and remote copies of a record.
///
/// Locally created records get a UUID v7 (time-sortable). Records pulled from
/// the remote keep whatever id the remote holds, so the value is treated as
/// opaque text everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an id read back from a store, byte for byte.
    ///
    /// Unlike [`FromStr`], which trims user input, stored ids are never
    /// rewritten. Only the empty string is rejected.
    pub fn from_stored(raw: String) -> Result<Self, Error> {
        if raw.is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".into()));
        }
        Ok(Self(raw))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Synchronization state of a local record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Local copy matches what was last pushed or pulled
    Synced,
    /// Local edits waiting to be pushed
    Modified,
    /// Tombstone waiting for the remote delete
    Deleted,
    /// Remote holds a newer version; needs a caller decision
    Conflict,
}

impl SyncStatus {
    /// All statuses, in persistence order
    pub const ALL: [Self; 4] = [Self::Synced, Self::Modified, Self::Deleted, Self::Conflict];

    /// Storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Conflict => "conflict",
        }
    }

    /// Whether the sync engine has work to do for this status
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Modified | Self::Deleted)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synced" => Ok(Self::Synced),
            "modified" => Ok(Self::Modified),
            "deleted" => Ok(Self::Deleted),
            "conflict" => Ok(Self::Conflict),
            other => Err(Error::InvalidInput(format!("unknown sync status '{other}'"))),
        }
    }
}

/// A versioned, status-tagged record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier
    pub id: RecordId,
    /// Display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last local mutation timestamp (Unix ms)
    pub updated_at: i64,
    /// Optimistic-concurrency counter, starts at 1
    pub version: i64,
    /// Where this record stands relative to the remote
    pub sync_status: SyncStatus,
}

impl Record {
    /// Create a new local record awaiting its first push
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
            version: 1,
            sync_status: SyncStatus::Modified,
        }
    }

    /// Apply a local content edit.
    ///
    /// Returns `false` and leaves the record untouched when it is a tombstone.
    pub fn apply_edit(&mut self, name: impl Into<String>, description: impl Into<String>) -> bool {
        if self.is_deleted() {
            return false;
        }
        self.name = name.into();
        self.description = description.into();
        self.version += 1;
        self.updated_at = now_millis().max(self.updated_at);
        self.sync_status = SyncStatus::Modified;
        true
    }

    /// Turn the record into a tombstone. Version is unchanged.
    pub fn mark_deleted(&mut self) -> bool {
        if self.is_deleted() {
            return false;
        }
        self.sync_status = SyncStatus::Deleted;
        true
    }

    /// Whether the record is a tombstone
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.sync_status == SyncStatus::Deleted
    }

    /// Get name as a single-line preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.name
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}
