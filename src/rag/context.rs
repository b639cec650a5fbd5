//! Context selection for RAG prompts.

use crate::embedding::{cosine_similarity, EmbeddingIndex, EmbeddingProvider};
use crate::error::{Result, TubeqaError};
use crate::tokens::{estimate_tokens, truncate_to_tokens};
use crate::transcript::{format_timestamp, TranscriptTable};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Prefix placed in front of every selected segment in a rendered context.
pub const SEPARATOR: &str = "\n* ";

/// A transcript segment chosen for a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSegment {
    /// Index of the segment in the transcript.
    pub index: usize,
    /// Segment text, possibly truncated to fit the budget.
    pub text: String,
    /// Similarity to the query.
    pub score: f32,
    /// Whether the text was cut to fit the budget.
    pub truncated: bool,
    /// Start time in the video, when known.
    pub start_seconds: Option<f64>,
}

/// Segments selected for one query, in transcript order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    segments: Vec<ContextSegment>,
    token_count: usize,
}

impl PromptContext {
    pub fn segments(&self) -> &[ContextSegment] {
        &self.segments
    }

    /// Estimated tokens of the selected segment texts.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment most similar to the query. Earliest segment wins ties.
    pub fn highest_ranked(&self) -> Option<&ContextSegment> {
        self.segments.iter().fold(None, |best: Option<&ContextSegment>, s| match best {
            Some(b) if b.score >= s.score => Some(b),
            _ => Some(s),
        })
    }

    /// Render the context for inclusion in a prompt.
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("{}{}", SEPARATOR, s.text))
            .collect()
    }
}

/// Picks the transcript segments relevant to a query.
pub struct ContextSelector {
    embedder: Arc<dyn EmbeddingProvider>,
    language: String,
}

impl ContextSelector {
    /// Create a selector. The embedder must be the one that built the document index.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, language: &str) -> Self {
        Self {
            embedder,
            language: language.to_string(),
        }
    }

    /// Select the context for a query under a token budget.
    #[instrument(skip(self, table, index), fields(segments = table.len()))]
    pub async fn select(
        &self,
        query: &str,
        table: &TranscriptTable,
        index: &EmbeddingIndex,
        max_tokens: usize,
    ) -> Result<PromptContext> {
        if max_tokens == 0 {
            return Err(TubeqaError::Config(
                "Token budget must be greater than zero".to_string(),
            ));
        }
        if table.is_empty() {
            return Err(TubeqaError::Data(format!(
                "Transcript of {} is empty",
                table.document_id
            )));
        }
        if index.strategy() != self.embedder.strategy() {
            return Err(TubeqaError::Config(format!(
                "Document was embedded with '{}' but queries use '{}'",
                index.strategy(),
                self.embedder.strategy()
            )));
        }
        if index.len() != table.len() {
            return Err(TubeqaError::Config(
                "Embedding index does not belong to this transcript".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed_query(query, &self.language).await?;
        if query_embedding.len() != index.dimensions() {
            return Err(TubeqaError::Config(format!(
                "Query embedding has {} dimensions, document embeddings have {}",
                query_embedding.len(),
                index.dimensions()
            )));
        }

        let context = select_context(&query_embedding, table, index, max_tokens);
        debug!(
            "Selected {} segments ({} tokens of {})",
            context.len(),
            context.token_count(),
            max_tokens
        );
        Ok(context)
    }
}

/// Rank segment indices by similarity to the query, best first.
///
/// Equal scores keep transcript order.
pub fn rank_segments(query_embedding: &[f32], index: &EmbeddingIndex) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = index
        .indices()
        .filter_map(|i| index.get(i).map(|v| (i, cosine_similarity(query_embedding, v))))
        .map(|(i, score)| if score.is_nan() { (i, f32::NEG_INFINITY) } else { (i, score) })
        .collect();

    // sort_by is stable and indices() is ascending
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Greedily fill the budget with the best-ranked segments.
///
/// Stops at the first segment that does not fit. When not even the best one
/// fits, its text is truncated so the context is never empty.
pub fn select_context(
    query_embedding: &[f32],
    table: &TranscriptTable,
    index: &EmbeddingIndex,
    max_tokens: usize,
) -> PromptContext {
    let mut segments: Vec<ContextSegment> = Vec::new();
    let mut token_count = 0;

    for (i, score) in rank_segments(query_embedding, index) {
        let Some(segment) = table.get(i) else {
            continue;
        };

        let tokens = estimate_tokens(&segment.text);
        if token_count + tokens > max_tokens {
            if segments.is_empty() {
                let text = truncate_to_tokens(&segment.text, max_tokens);
                token_count += estimate_tokens(text);
                segments.push(ContextSegment {
                    index: i,
                    text: text.to_string(),
                    score,
                    truncated: true,
                    start_seconds: segment.start_seconds,
                });
            }
            break;
        }

        token_count += tokens;
        segments.push(ContextSegment {
            index: i,
            text: segment.text.clone(),
            score,
            truncated: false,
            start_seconds: segment.start_seconds,
        });
    }

    segments.sort_by_key(|s| s.index);

    PromptContext {
        segments,
        token_count,
    }
}

/// Format selected segments for display to the user.
pub fn format_context_for_display(context: &PromptContext) -> String {
    context
        .segments()
        .iter()
        .map(|s| {
            let position = s
                .start_seconds
                .map(format_timestamp)
                .unwrap_or_else(|| format!("#{}", s.index));
            let marker = if s.truncated { " [truncated]" } else { "" };
            format!("{} (score: {:.2}){}\n  {}", position, s.score, marker, s.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingStrategy;
    use async_trait::async_trait;

    fn index_for(table: &TranscriptTable, vectors: Vec<Vec<f32>>) -> EmbeddingIndex {
        EmbeddingIndex::build(EmbeddingStrategy::Local, table, vectors).unwrap()
    }

    struct FixedQuery {
        strategy: EmbeddingStrategy,
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedQuery {
        fn strategy(&self) -> EmbeddingStrategy {
            self.strategy
        }

        async fn embed_passages(&self, texts: &[String], _language: &str) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }

        async fn embed_query(&self, _text: &str, _language: &str) -> Result<Vec<f32>> {
            Ok(self.vector.clone())
        }
    }

    fn selector(strategy: EmbeddingStrategy, vector: Vec<f32>) -> ContextSelector {
        ContextSelector::new(Arc::new(FixedQuery { strategy, vector }), "en")
    }

    #[test]
    fn test_output_keeps_transcript_order() {
        let table = TranscriptTable::from_texts("doc", ["zero", "one", "two", "three"]);
        let index = index_for(
            &table,
            vec![vec![0.1, 1.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
        );

        let ranked = rank_segments(&[1.0, 0.0], &index);
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 3);

        let context = select_context(&[1.0, 0.0], &table, &index, 4);
        let order: Vec<usize> = context.segments().iter().map(|s| s.index).collect();
        assert_eq!(order, vec![0, 1, 3]);
        assert_eq!(context.highest_ranked().unwrap().index, 1);
    }

    #[test]
    fn test_ties_prefer_earlier_segments() {
        let table = TranscriptTable::from_texts("doc", ["aaaa", "bbbb", "cccc"]);
        let index = index_for(&table, vec![vec![1.0, 0.0]; 3]);

        let ranked = rank_segments(&[1.0, 0.0], &index);
        let order: Vec<usize> = ranked.iter().map(|r| r.0).collect();
        assert_eq!(order, vec![0, 1, 2]);

        let context = select_context(&[1.0, 0.0], &table, &index, 2);
        let chosen: Vec<usize> = context.segments().iter().map(|s| s.index).collect();
        assert_eq!(chosen, vec![0, 1]);
    }

    #[test]
    fn test_budget_is_never_exceeded() {
        let texts: Vec<String> = (0..30)
            .map(|i| "word ".repeat(i % 7 + 1).trim().to_string())
            .collect();
        let table = TranscriptTable::from_texts("doc", texts);
        let vectors = (0..30).map(|i| vec![(i as f32).sin(), (i as f32).cos()]).collect();
        let index = index_for(&table, vectors);

        for budget in 1..40 {
            let context = select_context(&[0.3, 0.7], &table, &index, budget);
            assert!(!context.is_empty());
            assert!(context.token_count() <= budget, "budget {}", budget);
            let recount: usize = context.segments().iter().map(|s| estimate_tokens(&s.text)).sum();
            assert_eq!(recount, context.token_count());
        }
    }

    #[test]
    fn test_stops_at_first_segment_that_does_not_fit() {
        // ranked: 0 (1 token), 1 (6 tokens), 2 (1 token)
        let table = TranscriptTable::from_texts("doc", ["abc", "a much longer segment", "xyz"]);
        let index = index_for(&table, vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.5, 0.5]]);

        let context = select_context(&[1.0, 0.0], &table, &index, 3);
        let chosen: Vec<usize> = context.segments().iter().map(|s| s.index).collect();
        assert_eq!(chosen, vec![0]);
    }

    #[test]
    fn test_oversized_top_segment_is_truncated() {
        let table = TranscriptTable::from_texts(
            "doc",
            ["This single caption is much longer than the one token budget allows."],
        );
        let index = index_for(&table, vec![vec![1.0]]);

        let context = select_context(&[1.0], &table, &index, 1);
        assert_eq!(context.len(), 1);
        let segment = &context.segments()[0];
        assert!(segment.truncated);
        assert!(!segment.text.is_empty());
        assert!(estimate_tokens(&segment.text) <= 1);
        assert_eq!(context.render(), format!("{}{}", SEPARATOR, segment.text));
    }

    #[test]
    fn test_truncated_segment_with_leading_whitespace() {
        let table = TranscriptTable::from_texts("doc", ["   indented caption that is long"]);
        let index = index_for(&table, vec![vec![1.0]]);

        let context = select_context(&[1.0], &table, &index, 1);
        let segment = &context.segments()[0];
        assert!(segment.truncated);
        assert_eq!(segment.text, "inde");
        assert_eq!(context.render(), "\n* inde");
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let table = TranscriptTable::from_texts("doc", ["broken", "fine", "better"]);
        let index = index_for(
            &table,
            vec![vec![f32::NAN, 0.0], vec![0.5, 0.5], vec![1.0, 0.0]],
        );

        let order: Vec<usize> = rank_segments(&[1.0, 0.0], &index).iter().map(|r| r.0).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn test_select_validates_inputs() {
        let table = TranscriptTable::from_texts("doc", ["one"]);
        let index = index_for(&table, vec![vec![1.0, 0.0]]);

        let zero_budget = selector(EmbeddingStrategy::Local, vec![1.0, 0.0])
            .select("q", &table, &index, 0)
            .await
            .unwrap_err();
        assert!(zero_budget.is_configuration());

        let mixed = selector(EmbeddingStrategy::OpenAI, vec![1.0, 0.0])
            .select("q", &table, &index, 10)
            .await
            .unwrap_err();
        assert!(mixed.is_configuration());

        let wrong_dims = selector(EmbeddingStrategy::Local, vec![1.0, 0.0, 0.0])
            .select("q", &table, &index, 10)
            .await
            .unwrap_err();
        assert!(wrong_dims.is_configuration());

        let empty = TranscriptTable::from_texts("doc", Vec::<String>::new());
        let empty_index = index_for(&empty, Vec::new());
        let no_data = selector(EmbeddingStrategy::Local, vec![1.0, 0.0])
            .select("q", &empty, &empty_index, 10)
            .await
            .unwrap_err();
        assert!(no_data.is_data());
    }

    #[tokio::test]
    async fn test_select_ranks_with_query_embedding() {
        let table = TranscriptTable::from_texts("doc", ["Hello world.", "This is a test.", "Goodbye."]);
        let index = index_for(&table, vec![vec![1.0, 0.0], vec![0.7, 0.7], vec![0.0, 1.0]]);

        let context = selector(EmbeddingStrategy::Local, vec![0.1, 1.0])
            .select("What is said at the end?", &table, &index, 1000)
            .await
            .unwrap();

        assert_eq!(context.len(), 3);
        assert_eq!(context.highest_ranked().unwrap().text, "Goodbye.");
        assert_eq!(
            context.render(),
            "\n* Hello world.\n* This is a test.\n* Goodbye."
        );
    }

    #[test]
    fn test_format_for_display() {
        let table = TranscriptTable::from_texts("doc", ["Hello"]);
        let index = index_for(&table, vec![vec![1.0]]);
        let context = select_context(&[1.0], &table, &index, 10);

        assert_eq!(format_context_for_display(&context), "#0 (score: 1.00)\n  Hello");
    }
}
