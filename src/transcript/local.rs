//! Local transcript files.
//!
//! Supports json3 caption files, JSON arrays of caption strings and plain text
//! with one caption per line.

use super::{collapse_whitespace, parse_json3, TranscriptSource, TranscriptTable};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use std::path::Path;
use tracing::{info, instrument};

/// Reads transcripts from files on disk. The document ID is the file path.
pub struct LocalTranscriptSource;

impl LocalTranscriptSource {
    pub fn new() -> Self {
        Self
    }

    fn parse(document_id: &str, path: &Path, content: &str) -> Result<TranscriptTable> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_lowercase().as_str(), "json" | "json3"))
            .unwrap_or(false);

        if !is_json {
            let lines = content
                .lines()
                .map(collapse_whitespace)
                .filter(|line| !line.is_empty());
            return Ok(TranscriptTable::from_texts(document_id, lines));
        }

        match serde_json::from_str::<Vec<String>>(content) {
            Ok(captions) => Ok(TranscriptTable::from_texts(
                document_id,
                captions
                    .iter()
                    .map(|c| collapse_whitespace(c))
                    .filter(|c| !c.is_empty()),
            )),
            Err(_) => parse_json3(document_id, content),
        }
    }
}

impl Default for LocalTranscriptSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSource for LocalTranscriptSource {
    #[instrument(skip(self))]
    async fn fetch(&self, document_id: &str) -> Result<TranscriptTable> {
        let path = Path::new(document_id);
        if !path.is_file() {
            return Err(TubeqaError::Data(format!(
                "Transcript file not found: {}",
                document_id
            )));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let table = Self::parse(document_id, path, &content)?;

        info!("Read {} segments from {:?}", table.len(), path);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_plain_text_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "Hello world.\n\n  This is   a test.\nGoodbye.").unwrap();

        let id = file.path().to_str().unwrap().to_string();
        let table = LocalTranscriptSource::new().fetch(&id).await.unwrap();

        assert_eq!(table.texts(), vec!["Hello world.", "This is a test.", "Goodbye."]);
    }

    #[tokio::test]
    async fn test_json_array_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"["First", "", "Second"]"#).unwrap();

        let id = file.path().to_str().unwrap().to_string();
        let table = LocalTranscriptSource::new().fetch(&id).await.unwrap();

        assert_eq!(table.texts(), vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_json3_file() {
        let mut file = tempfile::Builder::new().suffix(".json3").tempfile().unwrap();
        write!(
            file,
            r#"{{"events": [{{"tStartMs": 1000, "dDurationMs": 500, "segs": [{{"utf8": "Hi"}}]}}]}}"#
        )
        .unwrap();

        let id = file.path().to_str().unwrap().to_string();
        let table = LocalTranscriptSource::new().fetch(&id).await.unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0).unwrap().start_seconds, Some(1.0));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = LocalTranscriptSource::new()
            .fetch("/definitely/not/here.txt")
            .await
            .unwrap_err();
        assert!(err.is_data());
    }
}
