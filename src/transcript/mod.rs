//! Transcript sources and the segment table they produce.
//!
//! A [`TranscriptSource`] turns a document identifier into an ordered
//! [`TranscriptTable`]. The table is the unit every later stage works on.

mod local;
mod youtube;

pub use local::LocalTranscriptSource;
pub use youtube::YoutubeTranscriptSource;

use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single caption of a transcript, in its chronological position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Position in the transcript (0-based).
    pub index: usize,
    /// Caption text.
    pub text: String,
    /// Start time in seconds, when the source provides timing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_seconds: Option<f64>,
    /// Duration in seconds, when the source provides timing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl TranscriptSegment {
    /// Create an untimed segment.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            start_seconds: None,
            duration_seconds: None,
        }
    }

    /// Attach timing information.
    pub fn with_timing(mut self, start_seconds: f64, duration_seconds: f64) -> Self {
        self.start_seconds = Some(start_seconds);
        self.duration_seconds = Some(duration_seconds);
        self
    }

    /// Format the start time as MM:SS or HH:MM:SS, if known.
    pub fn format_timestamp(&self) -> Option<String> {
        self.start_seconds.map(format_timestamp)
    }
}

/// The ordered segments of one document's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptTable {
    /// Identifier of the document the transcript belongs to.
    pub document_id: String,
    segments: Vec<TranscriptSegment>,
}

impl TranscriptTable {
    /// Build a table from caption texts, assigning indices in order.
    pub fn from_texts<I, S>(document_id: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| TranscriptSegment::new(i, text))
            .collect();

        Self {
            document_id: document_id.into(),
            segments,
        }
    }

    /// Build a table from segments. Indices are reassigned to match positions.
    pub fn from_segments(document_id: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        let segments = segments
            .into_iter()
            .enumerate()
            .map(|(i, mut s)| {
                s.index = i;
                s
            })
            .collect();

        Self {
            document_id: document_id.into(),
            segments,
        }
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptSegment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Caption texts in transcript order.
    pub fn texts(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.text.clone()).collect()
    }

    /// Full transcript text, captions joined by spaces.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format the transcript for display, with timestamps where known.
    pub fn format_for_display(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s.format_timestamp() {
                Some(ts) => format!("[{}] {}", ts, s.text),
                None => format!("[#{}] {}", s.index, s.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript of a document.
    ///
    /// Fails with [`TubeqaError::Data`] when the identifier is invalid or no
    /// transcript is available.
    async fn fetch(&self, document_id: &str) -> Result<TranscriptTable>;
}

/// Pick a transcript source for the given identifier.
///
/// Existing file paths are read locally; anything else is treated as a YouTube
/// video ID or URL.
pub fn detect_source(document_id: &str, ytdlp_path: &str, language: &str) -> Box<dyn TranscriptSource> {
    if Path::new(document_id).is_file() {
        Box::new(LocalTranscriptSource::new())
    } else {
        Box::new(YoutubeTranscriptSource::new(ytdlp_path, language))
    }
}

/// YouTube "json3" caption file.
#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: Option<u64>,
    #[serde(default)]
    d_duration_ms: Option<u64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a json3 caption document into timed segments.
///
/// Blank events (line breaks, styling-only events) are dropped and internal
/// whitespace is collapsed.
pub(crate) fn parse_json3(document_id: &str, json: &str) -> Result<TranscriptTable> {
    let captions: Json3Captions = serde_json::from_str(json)
        .map_err(|e| TubeqaError::Data(format!("Invalid caption file for {}: {}", document_id, e)))?;

    let segments = captions
        .events
        .into_iter()
        .filter_map(|event| {
            let raw: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = collapse_whitespace(&raw);
            if text.is_empty() {
                return None;
            }
            let start = event.t_start_ms.unwrap_or(0) as f64 / 1000.0;
            let duration = event.d_duration_ms.unwrap_or(0) as f64 / 1000.0;
            Some(TranscriptSegment::new(0, text).with_timing(start, duration))
        })
        .collect();

    Ok(TranscriptTable::from_segments(document_id, segments))
}

/// Replace newlines and runs of whitespace with single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
