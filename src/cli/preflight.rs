//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::embedding::EmbeddingStrategy;
use crate::error::{Result, TubeqaError};
use std::path::Path;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// Answering questions requires an API key, and yt-dlp for YouTube videos.
    Ask { document_id: &'a str },
    /// Printing a transcript only needs yt-dlp for YouTube videos.
    Transcript { document_id: &'a str },
    /// Reading the query log has no external requirements.
    History,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation<'_>, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask { document_id } => {
            // Validates the strategy name before anything is downloaded
            settings.embedding.strategy.parse::<EmbeddingStrategy>()?;
            check_api_key()?;
            check_transcript_tool(document_id, settings)?;
        }
        Operation::Transcript { document_id } => {
            check_transcript_tool(document_id, settings)?;
        }
        Operation::History => {}
    }
    Ok(())
}

fn check_transcript_tool(document_id: &str, settings: &Settings) -> Result<()> {
    if document_id.trim().is_empty() {
        return Err(TubeqaError::Config("Document ID is missing".to_string()));
    }
    if Path::new(document_id).is_file() {
        return Ok(());
    }
    check_tool(&settings.transcript.ytdlp_path)
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(TubeqaError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(TubeqaError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(TubeqaError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TubeqaError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TubeqaError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_history_no_requirements() {
        assert!(check(Operation::History, &Settings::default()).is_ok());
    }

    #[test]
    fn test_local_transcript_needs_no_tool() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut settings = Settings::default();
        settings.transcript.ytdlp_path = "definitely-not-a-real-tool".to_string();

        let document_id = file.path().to_string_lossy().to_string();
        assert!(check(Operation::Transcript { document_id: &document_id }, &settings).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let mut settings = Settings::default();
        settings.transcript.ytdlp_path = "definitely-not-a-real-tool".to_string();

        let err = check(Operation::Transcript { document_id: "abc123" }, &settings).unwrap_err();
        assert!(matches!(err, TubeqaError::ToolNotFound(_)));
    }

    #[test]
    fn test_unknown_strategy_fails_first() {
        let mut settings = Settings::default();
        settings.embedding.strategy = "bogus".to_string();

        let err = check(Operation::Ask { document_id: "abc123" }, &settings).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_blank_document_id() {
        let err = check(Operation::Transcript { document_id: "  " }, &Settings::default()).unwrap_err();
        assert!(err.is_configuration());
    }
}
