//! Client-facing services

mod store;

pub use store::RecordService;
