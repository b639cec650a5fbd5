//! Question-answering session over one video.
//!
//! A [`Session`] owns everything about one document: the transcript and its
//! embeddings (computed lazily on the first question and reused afterwards)
//! and the conversation history that grows with every answered question.
//!
//! `ask` takes `&mut self`. Sharing a session between tasks requires external
//! serialization (e.g. a `tokio::sync::Mutex`); two concurrent first
//! questions would otherwise each load the transcript.

use crate::config::{Prompts, Settings};
use crate::embedding::{create_provider, EmbeddingIndex, EmbeddingProvider, EmbeddingStrategy};
use crate::error::{Result, TubeqaError};
use crate::query_log::{QueryLog, QueryRecord};
use crate::rag::{
    AnswerComposer, Completer, ContextSelector, ConversationTurn, OpenAICompleter, PromptContext,
    ResponseMode,
};
use crate::transcript::{detect_source, TranscriptSource, TranscriptTable};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default token budget for transcript context.
pub const DEFAULT_MAX_TOKENS: usize = 1000;

/// Construction options of a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Language of the transcript and answers.
    pub language: String,
    /// Embedding strategy name: "hf" or "openai".
    pub strategy: String,
    /// Chat backend with multi-turn history instead of single-shot completion.
    pub turbo: bool,
    /// Token budget used when a question does not set one.
    pub max_tokens: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            strategy: "hf".to_string(),
            turbo: false,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn TranscriptSource>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub completer: Arc<dyn Completer>,
}

/// Per-question options.
#[derive(Clone, Copy, Default)]
pub struct AskOptions<'a> {
    /// Token budget for this question only; the session budget otherwise.
    pub max_tokens: Option<usize>,
    /// Record the question and answer in `query_log`.
    pub persist: bool,
    pub query_log: Option<&'a dyn QueryLog>,
}

impl<'a> AskOptions<'a> {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn persist_to(mut self, query_log: &'a dyn QueryLog) -> Self {
        self.persist = true;
        self.query_log = Some(query_log);
        self
    }
}

/// Answer to one question.
#[derive(Debug)]
pub struct Answer {
    pub answer: String,
    /// Prompt sent to the model.
    pub prompt: String,
    /// Conversation history after this exchange.
    pub history: Vec<ConversationTurn>,
    /// Transcript segments used as context.
    pub context: PromptContext,
    /// Set when the answer could not be recorded in the query log.
    pub persist_error: Option<TubeqaError>,
}

/// Everything a session knows about its document.
#[derive(Debug, Clone)]
struct SessionState {
    document_id: String,
    language: String,
    strategy: EmbeddingStrategy,
    max_tokens: usize,
    transcript: Option<TranscriptTable>,
    embeddings: Option<EmbeddingIndex>,
    history: Vec<ConversationTurn>,
    is_first_query: bool,
}

/// Stateful question answering over one document.
pub struct Session {
    state: SessionState,
    source: Arc<dyn TranscriptSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    composer: AnswerComposer,
}

impl Session {
    /// Create a session with explicit collaborators.
    ///
    /// Fails with a configuration error when the strategy name is unknown or
    /// does not match the embedder. No collaborator is called here.
    pub fn new(document_id: &str, options: SessionOptions, collaborators: Collaborators) -> Result<Self> {
        let strategy: EmbeddingStrategy = options.strategy.parse()?;
        if collaborators.embedder.strategy() != strategy {
            return Err(TubeqaError::Config(format!(
                "Embedding strategy '{}' does not match the provided '{}' embedder",
                strategy,
                collaborators.embedder.strategy()
            )));
        }
        if options.max_tokens == 0 {
            return Err(TubeqaError::Config(
                "Token budget must be greater than zero".to_string(),
            ));
        }

        let selector = ContextSelector::new(Arc::clone(&collaborators.embedder), &options.language);
        let composer = AnswerComposer::new(
            selector,
            collaborators.completer,
            ResponseMode::from_turbo(options.turbo),
            &options.language,
        );

        Ok(Self {
            state: SessionState {
                document_id: document_id.to_string(),
                language: options.language,
                strategy,
                max_tokens: options.max_tokens,
                transcript: None,
                embeddings: None,
                history: Vec::new(),
                is_first_query: true,
            },
            source: collaborators.source,
            embedder: collaborators.embedder,
            composer,
        })
    }

    /// Create a session wired to the configured services.
    pub fn from_settings(document_id: &str, settings: &Settings) -> Result<Self> {
        let strategy: EmbeddingStrategy = settings.embedding.strategy.parse()?;
        let timeout = Duration::from_secs(settings.completion.timeout_seconds);

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let collaborators = Collaborators {
            source: Arc::from(detect_source(
                document_id,
                &settings.transcript.ytdlp_path,
                &settings.general.language,
            )),
            embedder: create_provider(strategy, &settings.embedding, timeout)?,
            completer: Arc::new(OpenAICompleter::from_settings(&settings.completion)?),
        };

        let options = SessionOptions {
            language: settings.general.language.clone(),
            strategy: settings.embedding.strategy.clone(),
            turbo: settings.completion.turbo,
            max_tokens: settings.retrieval.max_tokens,
        };

        Ok(Self::new(document_id, options, collaborators)?.with_prompts(prompts))
    }

    /// Set custom prompts.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.composer = self.composer.with_prompts(prompts);
        self
    }

    /// Ask a question about the document.
    ///
    /// The transcript and its embeddings are loaded on the first call and
    /// reused afterwards. A failure leaves the conversation untouched. When
    /// persistence is requested, the record is written after the answer is
    /// computed; a write failure is returned in [`Answer::persist_error`].
    #[instrument(skip(self, options), fields(document = %self.state.document_id))]
    pub async fn ask(&mut self, query: &str, options: AskOptions<'_>) -> Result<Answer> {
        let query_log = match (options.persist, options.query_log) {
            (true, None) => {
                return Err(TubeqaError::Config(
                    "Persisting a query requires a query log".to_string(),
                ))
            }
            (true, Some(log)) => Some(log),
            (false, _) => None,
        };

        let max_tokens = options.max_tokens.unwrap_or(self.state.max_tokens);
        if max_tokens == 0 {
            return Err(TubeqaError::Config(
                "Token budget must be greater than zero".to_string(),
            ));
        }

        if self.state.transcript.is_none() {
            if self.state.document_id.trim().is_empty() {
                return Err(TubeqaError::Config("Document ID is missing".to_string()));
            }
            info!("Fetching transcript");
            let table = self.source.fetch(&self.state.document_id).await?;
            self.state.transcript = Some(table);
        }

        let table = self
            .state
            .transcript
            .as_ref()
            .ok_or_else(|| TubeqaError::Data("Transcript not loaded".to_string()))?;
        if table.is_empty() {
            return Err(TubeqaError::Data(format!(
                "No transcript available for {}",
                self.state.document_id
            )));
        }

        if self.state.embeddings.is_none() {
            info!("Computing embeddings for {} segments", table.len());
            let index = self.embedder.embed_document(table, &self.state.language).await?;
            self.state.embeddings = Some(index);
        }

        let index = self
            .state
            .embeddings
            .as_ref()
            .ok_or_else(|| TubeqaError::Upstream("Embeddings not computed".to_string()))?;

        let composed = self
            .composer
            .answer_query(
                query,
                table,
                index,
                &self.state.history,
                self.state.is_first_query,
                max_tokens,
            )
            .await?;

        self.state.history = composed.history.clone();
        self.state.is_first_query = false;

        let persist_error = match query_log {
            Some(log) => {
                info!("Saving query to log");
                let record = QueryRecord::new(
                    &self.state.document_id,
                    query,
                    &composed.answer,
                    &composed.prompt,
                );
                log.record(&record).await.err().map(|e| {
                    warn!("Failed to save query: {}", e);
                    match e {
                        TubeqaError::Persistence(_) => e,
                        other => TubeqaError::Persistence(other.to_string()),
                    }
                })
            }
            None => None,
        };

        Ok(Answer {
            answer: composed.answer,
            prompt: composed.prompt,
            history: composed.history,
            context: composed.context,
            persist_error,
        })
    }

    /// Forget the conversation. The transcript and embeddings stay cached.
    pub fn clear_history(&mut self) {
        self.state.history.clear();
        self.state.is_first_query = true;
    }

    pub fn document_id(&self) -> &str {
        &self.state.document_id
    }

    pub fn language(&self) -> &str {
        &self.state.language
    }

    pub fn strategy(&self) -> EmbeddingStrategy {
        self.state.strategy
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.composer.mode()
    }

    /// Token budget used by questions that do not set their own.
    pub fn max_tokens(&self) -> usize {
        self.state.max_tokens
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.state.history
    }

    pub fn is_first_query(&self) -> bool {
        self.state.is_first_query
    }

    /// The transcript, once loaded.
    pub fn transcript(&self) -> Option<&TranscriptTable> {
        self.state.transcript.as_ref()
    }

    /// The segment embeddings, once computed.
    pub fn embeddings(&self) -> Option<&EmbeddingIndex> {
        self.state.embeddings.as_ref()
    }
}
