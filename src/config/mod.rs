//! Configuration module for tubeqa.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, QaPrompts, FALLBACK_LANGUAGE};
pub use settings::{
    CompletionSettings, EmbeddingSettings, GeneralSettings, LogSettings, PromptSettings,
    RetrievalSettings, Settings, TranscriptSettings,
};
