use std::path::Path;

use itemsync_core::sync::{SyncOutcome, SyncReport};
use itemsync_core::SyncConfig;
use tokio_util::sync::CancellationToken;

use crate::commands::common::{build_sync_engine, format_report_lines, open_store};
use crate::error::CliError;

pub async fn run_sync(
    db_path: &Path,
    sync_config: Option<&SyncConfig>,
    as_json: bool,
) -> Result<SyncReport, CliError> {
    let store = open_store(db_path).await?;
    let engine = build_sync_engine(store, sync_config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let report = engine.sync_with_cancel(&cancel).await;
    ctrl_c.abort();
    let report = report?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }

    if let SyncOutcome::ConnectionFailed { message } = &report.outcome {
        return Err(CliError::SyncFailed(message.clone()));
    }
    Ok(report)
}
