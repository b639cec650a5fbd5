//! Local sentence-embedding models via fastembed (ONNX runtime).
//!
//! Models are downloaded and loaded on first use, then kept for the lifetime
//! of the embedder. English transcripts use an English model; every other
//! language uses a multilingual one.

use super::{EmbeddingProvider, EmbeddingStrategy};
use crate::config::EmbeddingSettings;
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Supported local models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalModel {
    /// sentence-transformers/all-MiniLM-L6-v2, 384 dimensions.
    AllMiniLmL6V2,
    /// BAAI/bge-small-en-v1.5, 384 dimensions.
    BgeSmallEnV15,
    /// intfloat/multilingual-e5-small, 384 dimensions.
    MultilingualE5Small,
}

impl LocalModel {
    fn fastembed_model(self) -> EmbeddingModel {
        match self {
            LocalModel::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            LocalModel::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            LocalModel::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
        }
    }

    /// Prefix the model expects in front of queries.
    pub fn query_prefix(self) -> &'static str {
        match self {
            LocalModel::MultilingualE5Small => "query: ",
            _ => "",
        }
    }

    /// Prefix the model expects in front of indexed passages.
    pub fn passage_prefix(self) -> &'static str {
        match self {
            LocalModel::MultilingualE5Small => "passage: ",
            _ => "",
        }
    }
}

impl FromStr for LocalModel {
    type Err = TubeqaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all-minilm-l6-v2" => Ok(LocalModel::AllMiniLmL6V2),
            "bge-small-en-v1.5" => Ok(LocalModel::BgeSmallEnV15),
            "multilingual-e5-small" => Ok(LocalModel::MultilingualE5Small),
            _ => Err(TubeqaError::Config(format!("Unknown local embedding model: {}", s))),
        }
    }
}

/// Embedder running sentence-embedding models in-process.
pub struct LocalEmbedder {
    english_model: LocalModel,
    multilingual_model: LocalModel,
    models: Arc<Mutex<HashMap<LocalModel, TextEmbedding>>>,
}

impl LocalEmbedder {
    pub fn new(english_model: LocalModel, multilingual_model: LocalModel) -> Self {
        Self {
            english_model,
            multilingual_model,
            models: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self::new(
            settings.local_model_en.parse()?,
            settings.local_model_multilingual.parse()?,
        ))
    }

    /// Model used for a language hint.
    pub fn model_for(&self, language: &str) -> LocalModel {
        if language.trim().to_lowercase().starts_with("en") {
            self.english_model
        } else {
            self.multilingual_model
        }
    }

    /// Run a model on a blocking thread, loading it on first use.
    async fn run(&self, model: LocalModel, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let models = Arc::clone(&self.models);
        tokio::task::spawn_blocking(move || {
            let mut models = models
                .lock()
                .map_err(|e| TubeqaError::Upstream(format!("Embedding model lock poisoned: {}", e)))?;

            let embedder = match models.entry(model) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    info!("Loading local embedding model {:?}", model);
                    let loaded = TextEmbedding::try_new(
                        InitOptions::new(model.fastembed_model()).with_show_download_progress(false),
                    )
                    .map_err(|e| {
                        TubeqaError::Upstream(format!("Failed to load embedding model {:?}: {}", model, e))
                    })?;
                    entry.insert(loaded)
                }
            };

            debug!("Embedding {} texts with {:?}", inputs.len(), model);
            embedder
                .embed(inputs, None)
                .map_err(|e| TubeqaError::Upstream(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| TubeqaError::Upstream(format!("Embedding task failed: {}", e)))?
    }
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(LocalModel::AllMiniLmL6V2, LocalModel::MultilingualE5Small)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedder {
    fn strategy(&self) -> EmbeddingStrategy {
        EmbeddingStrategy::Local
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_passages(&self, texts: &[String], language: &str) -> Result<Vec<Vec<f32>>> {
        let model = self.model_for(language);
        let inputs = texts
            .iter()
            .map(|t| format!("{}{}", model.passage_prefix(), t))
            .collect();
        self.run(model, inputs).await
    }

    #[instrument(skip(self, text))]
    async fn embed_query(&self, text: &str, language: &str) -> Result<Vec<f32>> {
        let model = self.model_for(language);
        let input = format!("{}{}", model.query_prefix(), text);
        self.run(model, vec![input])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TubeqaError::Upstream("Empty embedding response".to_string()))
    }
}
