use std::path::Path;

use crate::commands::common::{normalize_record_identifier, open_store, resolve_record};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let store = open_store(db_path).await?;
    let record = resolve_record(&normalized_id, &store).await?;

    if !store.delete_record(&record.id).await? {
        tracing::debug!("Record {} was already deleted", record.id);
    }
    println!("{}", record.id);
    Ok(())
}
