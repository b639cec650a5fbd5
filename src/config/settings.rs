//! Configuration settings for tubeqa.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub completion: CompletionSettings,
    pub retrieval: RetrievalSettings,
    pub transcript: TranscriptSettings,
    pub log: LogSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Language of the transcript and of the answers (e.g. "en", "tr").
    pub language: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding strategy: "hf" (local model) or "openai" (API).
    pub strategy: String,
    /// OpenAI embedding model.
    pub openai_model: String,
    /// OpenAI embedding dimensions.
    pub dimensions: u32,
    /// Local model used for English transcripts.
    pub local_model_en: String,
    /// Local model used for every other language.
    pub local_model_multilingual: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            strategy: "hf".to_string(),
            openai_model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            local_model_en: "all-minilm-l6-v2".to_string(),
            local_model_multilingual: "multilingual-e5-small".to_string(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Use the chat backend with multi-turn history instead of single-shot completion.
    pub turbo: bool,
    /// Model for chat mode.
    pub chat_model: String,
    /// Model for completion mode.
    pub completion_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens in a generated answer.
    pub max_answer_tokens: u32,
    /// HTTP timeout for OpenAI requests, in seconds.
    pub timeout_seconds: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            turbo: false,
            chat_model: "gpt-4o-mini".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            temperature: 0.0,
            max_answer_tokens: 300,
            timeout_seconds: crate::openai::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Context selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Default token budget for transcript context in a prompt.
    pub max_tokens: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { max_tokens: 1000 }
    }
}

/// Transcript fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Path or name of the yt-dlp binary.
    pub ytdlp_path: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

/// Query log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Record every question and answer by default.
    pub persist: bool,
    /// Path to the SQLite query log.
    pub sqlite_path: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            persist: false,
            sqlite_path: "~/.tubeqa/queries.db".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TubeqaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubeqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded query log path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.log.sqlite_path)
    }
}
