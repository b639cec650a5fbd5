//! YouTube caption source backed by yt-dlp.

use super::{parse_json3, TranscriptSource, TranscriptTable};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Fetches YouTube captions (manual or automatic) with yt-dlp.
pub struct YoutubeTranscriptSource {
    ytdlp_path: String,
    language: String,
    video_id_regex: Regex,
}

impl YoutubeTranscriptSource {
    pub fn new(ytdlp_path: &str, language: &str) -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("static regex is valid");

        Self {
            ytdlp_path: ytdlp_path.to_string(),
            language: language.to_string(),
            video_id_regex,
        }
    }

    /// Extract video ID from a YouTube URL or bare ID.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;

        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// Download the caption file for a video into `dir` and return its contents.
    async fn download_captions(&self, video_id: &str, dir: &Path) -> Result<String> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let output_template = dir.join("%(id)s.%(ext)s");
        let sub_langs = format!("{lang}.*,{lang}", lang = self.language);

        let output = tokio::process::Command::new(&self.ytdlp_path)
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .args(["--sub-langs", &sub_langs])
            .args(["--sub-format", "json3"])
            .arg("--no-warnings")
            .arg("-o")
            .arg(&output_template)
            .arg(&url)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TubeqaError::ToolNotFound(self.ytdlp_path.clone())
                } else {
                    TubeqaError::Data(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TubeqaError::Data(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        let caption_file = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| path.extension().is_some_and(|ext| ext == "json3"))
            .ok_or_else(|| {
                TubeqaError::Data(format!(
                    "No '{}' captions available for video {}",
                    self.language, video_id
                ))
            })?;

        debug!("Reading captions from {:?}", caption_file);
        Ok(std::fs::read_to_string(caption_file)?)
    }
}

impl Default for YoutubeTranscriptSource {
    fn default() -> Self {
        Self::new("yt-dlp", "en")
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    #[instrument(skip(self))]
    async fn fetch(&self, document_id: &str) -> Result<TranscriptTable> {
        let video_id = self.extract_video_id(document_id).ok_or_else(|| {
            TubeqaError::Data(format!("Invalid YouTube video ID or URL: {}", document_id))
        })?;

        info!("Fetching captions for {}", video_id);

        let dir = tempfile::Builder::new().prefix("tubeqa-").tempdir()?;
        let json = self.download_captions(&video_id, dir.path()).await?;
        let table = parse_json3(&video_id, &json)?;

        info!("Fetched {} caption segments", table.len());
        Ok(table)
    }
}
