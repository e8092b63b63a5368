use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use itemsync_core::sync::{SyncFailure, SyncOutcome, SyncReport};
use itemsync_core::util::{compact_text, normalize_text_option};
use itemsync_core::{
    LibSqlRemote, Record, RecordId, RecordService, RemoteProbe, RemoteStore, SyncConfig,
    SyncEngine, SyncStatus,
};
use serde::Serialize;

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub type CliSyncEngine = SyncEngine<LibSqlRemote, RemoteProbe>;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: SyncStatus,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

/// Remote settings read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncEnv {
    pub remote_url: Option<String>,
    pub auth_token: Option<String>,
    pub probe_url: Option<String>,
}

impl SyncEnv {
    pub fn from_env() -> Self {
        Self {
            remote_url: normalize_text_option(env::var("ITEMSYNC_REMOTE_URL").ok()),
            auth_token: normalize_text_option(env::var("ITEMSYNC_AUTH_TOKEN").ok()),
            probe_url: normalize_text_option(env::var("ITEMSYNC_PROBE_URL").ok()),
        }
    }
}

pub async fn open_store(path: &Path) -> Result<RecordService, CliError> {
    Ok(RecordService::open_path(path).await?)
}

pub async fn list_records(
    store: &RecordService,
    status: Option<SyncStatus>,
    limit: usize,
) -> Result<Vec<Record>, CliError> {
    let mut records = match status {
        Some(status) => store.list_by_status(&[status]).await?,
        None => store.list_active().await?,
    };
    records.truncate(limit);
    Ok(records)
}

/// Find a record by exact id or unique id prefix, tombstones included.
pub async fn resolve_record(query: &str, store: &RecordService) -> Result<Record, CliError> {
    if let Ok(id) = query.parse::<RecordId>() {
        if let Some(record) = store.get_record(&id).await? {
            return Ok(record);
        }
    }

    let matching_ids = store.list_ids_by_prefix(query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::RecordNotFound(query.to_string())),
        1 => {
            let resolved_id = RecordId::from_stored(matching_ids[0].clone())
                .map_err(|_| CliError::RecordNotFound(query.to_string()))?;
            store
                .get_record(&resolved_id)
                .await?
                .ok_or_else(|| CliError::RecordNotFound(query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_record_lines(records: &[Record]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let short_id = short_id(record.id.as_str());
            let preview = record.title_preview(40);
            let relative_time = format_relative_time(record.updated_at, now_ms);
            let status = record.sync_status;
            format!("{short_id:<13}  {status:<8}  v{:<3}  {preview:<40}  {relative_time}", record.version)
        })
        .collect()
}

pub fn format_record_details(record: &Record) -> Vec<String> {
    let mut lines = vec![
        format!("id:          {}", record.id),
        format!("name:        {}", record.name),
        format!("status:      {}", record.sync_status),
        format!("version:     {}", record.version),
        format!("created:     {}", format_timestamp(record.created_at)),
        format!("updated:     {}", format_timestamp(record.updated_at)),
    ];
    if !record.description.is_empty() {
        lines.push(String::new());
        lines.extend(record.description.lines().map(str::to_string));
    }
    lines
}

pub fn record_to_list_item(record: &Record) -> RecordListItem {
    let now_ms = Utc::now().timestamp_millis();
    RecordListItem {
        id: record.id.to_string(),
        name: record.name.clone(),
        description: record.description.clone(),
        status: record.sync_status,
        version: record.version,
        created_at: record.created_at,
        updated_at: record.updated_at,
        relative_time: format_relative_time(record.updated_at, now_ms),
    }
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let summary = format!(
        "pushed {}, pulled {}, conflicts {}, purged {}, failed {}",
        report.pushed,
        report.pulled,
        report.conflicts,
        report.purged,
        report.failed()
    );

    let mut lines = vec![match &report.outcome {
        SyncOutcome::Offline => {
            "Remote unreachable; local changes are kept for the next sync".to_string()
        }
        SyncOutcome::ConnectionFailed { message } => format!("Remote connection failed: {message}"),
        SyncOutcome::Completed => format!("Sync completed: {summary}"),
        SyncOutcome::Cancelled => format!("Sync cancelled: {summary}"),
    }];
    lines.extend(report.failures.iter().map(format_failure_line));
    if report.conflicts > 0 {
        lines.push("Run `itemsync conflicts` to review, then `itemsync resolve <id> local|remote`.".to_string());
    }
    lines
}

fn format_failure_line(failure: &SyncFailure) -> String {
    let target = failure
        .record_id
        .as_ref()
        .map_or_else(|| "(remote scan)".to_string(), |id| short_id(id.as_str()));
    format!(
        "  failed {target} during {} ({:?}): {}",
        failure.stage,
        failure.kind,
        compact_text(&failure.message)
    )
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_record_name(name_parts: &[String]) -> Result<String, CliError> {
    if let Some(name) = normalize_content(&name_parts.join(" ")) {
        return Ok(name);
    }

    if let Some(name) = read_piped_stdin()? {
        return Ok(name);
    }

    Err(CliError::EmptyName)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_record_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyRecordId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Editor buffer layout: name on the first line, description after a blank line
pub fn render_editor_text(record: &Record) -> String {
    if record.description.is_empty() {
        format!("{}\n", record.name)
    } else {
        format!("{}\n\n{}\n", record.name, record.description)
    }
}

pub fn parse_editor_text(text: &str) -> Option<(String, String)> {
    let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
    let name = normalize_content(lines.next()?)?;
    let description = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Some((name, description))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_record_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let edited = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&edited))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_record_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("itemsync-record-{}-{now}.txt", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("ITEMSYNC_DB_PATH").map(PathBuf::from))
    {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("itemsync").join("itemsync.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

/// Sync settings for the selected profile with environment overrides applied.
pub fn load_sync_config(profile: Option<&str>) -> Result<Option<SyncConfig>, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let sync_config = merge_sync_config(&profile, &SyncEnv::from_env());
    if sync_config.is_some() {
        tracing::debug!("Using sync settings from profile '{}'", profile_name);
    }
    Ok(sync_config)
}

pub fn merge_sync_config(profile: &CliProfile, env: &SyncEnv) -> Option<SyncConfig> {
    let remote_url = env.remote_url.clone().or_else(|| profile.remote_url())?;
    let mut config = SyncConfig::new(remote_url);
    if let Some(token) = env.auth_token.clone() {
        config = config.with_auth_token(token);
    }
    if let Some(probe_url) = env.probe_url.clone().or_else(|| profile.probe_url()) {
        config = config.with_probe_url(probe_url);
    }
    Some(config)
}

pub fn build_sync_engine(
    store: RecordService,
    sync_config: Option<&SyncConfig>,
) -> Result<CliSyncEngine, CliError> {
    let Some(config) = sync_config.filter(|config| config.is_configured()) else {
        return Err(CliError::SyncNotConfigured);
    };

    let remote = LibSqlRemote::from_config(config)?;
    let probe = RemoteProbe::from_config(config)?;
    tracing::info!("Sync enabled with remote {}", remote.describe());
    Ok(SyncEngine::new(store, remote, probe))
}
