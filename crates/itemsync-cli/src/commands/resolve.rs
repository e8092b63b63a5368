use std::path::Path;

use itemsync_core::{Resolution, SyncConfig, SyncStatus};

use crate::commands::common::{
    build_sync_engine, normalize_record_identifier, open_store, resolve_record,
};
use crate::error::CliError;

pub async fn run_resolve(
    id: &str,
    resolution: Resolution,
    db_path: &Path,
    sync_config: Option<&SyncConfig>,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let store = open_store(db_path).await?;
    let record = resolve_record(&normalized_id, &store).await?;

    if record.sync_status != SyncStatus::Conflict {
        println!("Record {} is {}, nothing to resolve", record.id, record.sync_status);
        return Ok(());
    }

    let engine = build_sync_engine(store, sync_config)?;
    engine.resolve(&record.id, resolution).await?;
    println!("{}", record.id);
    Ok(())
}
