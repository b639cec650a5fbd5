//! Embedding generation for semantic retrieval over a transcript.
//!
//! Two interchangeable strategies exist: a local model run through fastembed
//! (`hf`) and the OpenAI embeddings API (`openai`). A session picks one at
//! construction and uses it for both the document and every query, so that
//! all vectors live in the same space.

mod local;
mod openai;

pub use local::{LocalEmbedder, LocalModel};
pub use openai::OpenAIEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{Result, TubeqaError};
use crate::transcript::TranscriptTable;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which embedding backend produced a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingStrategy {
    /// Local sentence-embedding model (`hf`).
    Local,
    /// OpenAI embeddings API (`openai`).
    OpenAI,
}

impl FromStr for EmbeddingStrategy {
    type Err = TubeqaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hf" | "local" => Ok(EmbeddingStrategy::Local),
            "openai" => Ok(EmbeddingStrategy::OpenAI),
            _ => Err(TubeqaError::Config(format!(
                "Unknown embedding strategy '{}' (expected 'hf' or 'openai')",
                s
            ))),
        }
    }
}

impl std::fmt::Display for EmbeddingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingStrategy::Local => write!(f, "hf"),
            EmbeddingStrategy::OpenAI => write!(f, "openai"),
        }
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// The strategy this provider implements.
    fn strategy(&self) -> EmbeddingStrategy;

    /// Embed document passages, one vector per text, in input order.
    async fn embed_passages(&self, texts: &[String], language: &str) -> Result<Vec<Vec<f32>>>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str, language: &str) -> Result<Vec<f32>>;

    /// Embed every segment of a transcript.
    async fn embed_document(&self, table: &TranscriptTable, language: &str) -> Result<EmbeddingIndex> {
        let vectors = self.embed_passages(&table.texts(), language).await?;
        EmbeddingIndex::build(self.strategy(), table, vectors)
    }
}

/// Segment embeddings of one transcript, keyed by segment index.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingIndex {
    strategy: EmbeddingStrategy,
    dimensions: usize,
    vectors: BTreeMap<usize, Vec<f32>>,
}

impl EmbeddingIndex {
    /// Pair a table's segments with their vectors.
    ///
    /// The vector list must be as long as the table and of uniform dimension;
    /// anything else is treated as a broken provider response.
    pub fn build(
        strategy: EmbeddingStrategy,
        table: &TranscriptTable,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if vectors.len() != table.len() {
            return Err(TubeqaError::Upstream(format!(
                "Expected {} embeddings, got {}",
                table.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if vectors.iter().any(|v| v.len() != dimensions) {
            return Err(TubeqaError::Upstream(
                "Embeddings have inconsistent dimensions".to_string(),
            ));
        }

        let vectors = table
            .segments()
            .iter()
            .map(|s| s.index)
            .zip(vectors)
            .collect();

        Ok(Self {
            strategy,
            dimensions,
            vectors,
        })
    }

    pub fn strategy(&self) -> EmbeddingStrategy {
        self.strategy
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[f32]> {
        self.vectors.get(&index).map(Vec::as_slice)
    }

    /// Segment indices covered by this index, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.vectors.keys().copied()
    }
}

/// Build the provider for a strategy.
///
/// Construction never touches the network: local models load on first use and
/// the OpenAI client only connects when a request is made.
pub fn create_provider(
    strategy: EmbeddingStrategy,
    settings: &EmbeddingSettings,
    timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match strategy {
        EmbeddingStrategy::Local => Ok(Arc::new(LocalEmbedder::from_settings(settings)?)),
        EmbeddingStrategy::OpenAI => Ok(Arc::new(OpenAIEmbedder::with_config(
            &settings.openai_model,
            settings.dimensions as usize,
            timeout,
        )?)),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
