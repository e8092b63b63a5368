//! Data models for itemsync

mod record;

pub use record::{Record, RecordId, SyncStatus};
