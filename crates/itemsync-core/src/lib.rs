//! itemsync-core - Core library for itemsync
//!
//! This crate contains the record model, the local libSQL store, the remote
//! adapter and the sync engine used by all itemsync clients.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;
pub mod util;

pub use config::{RemoteTarget, SyncConfig};
pub use connectivity::{ConnectivityProbe, FixedProbe, HttpProbe, RemoteProbe};
pub use error::{Error, Result};
pub use models::{Record, RecordId, SyncStatus};
pub use remote::{LibSqlRemote, RejectedRow, RemoteRecord, RemoteScan, RemoteSession, RemoteStore};
pub use services::RecordService;
pub use sync::{Resolution, SyncEngine, SyncOutcome, SyncReport};
