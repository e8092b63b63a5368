use std::path::Path;

use itemsync_core::SyncStatus;

use crate::commands::common::{
    format_record_lines, list_records, open_store, record_to_list_item, RecordListItem,
};
use crate::error::CliError;

pub async fn run_list(
    status: Option<SyncStatus>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let records = list_records(&store, status, limit).await?;

    if as_json {
        let json_items = records
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_record_lines(&records) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_conflicts(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let conflicts = store.list_by_status(&[SyncStatus::Conflict]).await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(record_to_list_item)
            .collect::<Vec<RecordListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts.");
        return Ok(());
    }

    for line in format_record_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
