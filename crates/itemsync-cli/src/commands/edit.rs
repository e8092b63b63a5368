use std::path::Path;

use itemsync_core::Record;

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_content, normalize_record_identifier,
    open_store, parse_editor_text, render_editor_text, resolve_record,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    name: Option<String>,
    description: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let normalized_id = normalize_record_identifier(id)?;
    let store = open_store(db_path).await?;
    let record = resolve_record(&normalized_id, &store).await?;
    if record.is_deleted() {
        return Err(CliError::RecordDeleted(record.id.to_string()));
    }

    let (new_name, new_description) = if name.is_none() && description.is_none() {
        let Some(edited) = capture_editor_input_with_initial(&render_editor_text(&record))? else {
            return Err(CliError::EmptyName);
        };
        parse_editor_text(&edited).ok_or(CliError::EmptyName)?
    } else {
        merge_edit(&record, name, description)?
    };

    if new_name == record.name && new_description == record.description {
        println!("{}", record.id);
        return Ok(());
    }

    let updated = store
        .update_record(&record.id, &new_name, &new_description)
        .await?
        .ok_or_else(|| CliError::RecordDeleted(record.id.to_string()))?;
    println!("{}", updated.id);
    Ok(())
}

/// Apply flag values over the current content; omitted flags keep the old value.
pub fn merge_edit(
    record: &Record,
    name: Option<String>,
    description: Option<String>,
) -> Result<(String, String), CliError> {
    let name = match name {
        Some(name) => normalize_content(&name).ok_or(CliError::EmptyName)?,
        None => record.name.clone(),
    };
    let description =
        description.map_or_else(|| record.description.clone(), |text| text.trim().to_string());
    Ok((name, description))
}
