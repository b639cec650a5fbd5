//! History command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::query_log::{QueryLog, SqliteQueryLog};
use anyhow::Result;

/// Run the history command.
pub async fn run_history(limit: usize, settings: Settings) -> Result<()> {
    let path = settings.sqlite_path();
    if !path.exists() {
        Output::info("No questions logged yet. Use '--persist' to save them.");
        return Ok(());
    }

    let log = SqliteQueryLog::new(&path)?;

    match log.recent(limit).await {
        Ok(records) => {
            if records.is_empty() {
                Output::info("No questions logged yet. Use '--persist' to save them.");
                return Ok(());
            }

            let total = log.count().await?;
            Output::header(&format!("Recent questions ({} of {})", records.len(), total));

            for record in &records {
                Output::history_entry(
                    &record.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    &record.document_id,
                    &record.query,
                    &record.answer,
                );
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to read query log: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
