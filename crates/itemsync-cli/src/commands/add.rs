use std::path::Path;

use crate::commands::common::{open_store, resolve_record_name};
use crate::error::CliError;

pub async fn run_add(name_parts: &[String], description: &str, db_path: &Path) -> Result<(), CliError> {
    let name = resolve_record_name(name_parts)?;

    let store = open_store(db_path).await?;
    let record = store.add_record(&name, description.trim()).await?;

    println!("{}", record.id);
    Ok(())
}
