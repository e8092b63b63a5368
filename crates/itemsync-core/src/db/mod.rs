//! Local record store

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{LibSqlRecordRepository, LocalBatch, RecordRepository, StatusChange};

pub(crate) use migrations::CREATE_ITEMS_TABLE;
