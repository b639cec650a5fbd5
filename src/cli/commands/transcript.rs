//! Transcript command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::detect_source;
use anyhow::Result;

/// Run the transcript command.
pub async fn run_transcript(video: &str, lang: Option<String>, json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcript { document_id: video }, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let language = lang.unwrap_or_else(|| settings.general.language.clone());
    let source = detect_source(video, &settings.transcript.ytdlp_path, &language);

    let spinner = Output::spinner("Fetching transcript...");
    let table = match source.fetch(video).await {
        Ok(table) => {
            spinner.finish_and_clear();
            table
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to fetch transcript: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(table.segments())?);
    } else if table.is_empty() {
        Output::warning("The transcript is empty.");
    } else {
        Output::header(&format!("Transcript of {} ({} segments)", table.document_id, table.len()));
        println!("{}", table.format_for_display());
    }

    Ok(())
}
