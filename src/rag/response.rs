//! Prompt composition and answer generation.

use super::{
    Completer, CompletionRequest, ContextSelector, ConversationTurn, PromptContext, ResponseMode,
};
use crate::config::Prompts;
use crate::embedding::EmbeddingIndex;
use crate::error::Result;
use crate::transcript::TranscriptTable;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Result of answering one query.
#[derive(Debug, Clone)]
pub struct ComposedAnswer {
    /// The generated answer.
    pub answer: String,
    /// The prompt that was built for the model.
    pub prompt: String,
    /// Conversation history including this exchange.
    pub history: Vec<ConversationTurn>,
    /// Transcript segments used as context.
    pub context: PromptContext,
}

/// Builds prompts from selected transcript context and asks the model.
pub struct AnswerComposer {
    selector: ContextSelector,
    completer: Arc<dyn Completer>,
    prompts: Prompts,
    mode: ResponseMode,
    language: String,
}

impl AnswerComposer {
    pub fn new(
        selector: ContextSelector,
        completer: Arc<dyn Completer>,
        mode: ResponseMode,
        language: &str,
    ) -> Self {
        Self {
            selector,
            completer,
            prompts: Prompts::default(),
            mode,
            language: language.to_string(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Build the prompt for a question from its selected context.
    pub fn compose_prompt(&self, query: &str, context: &PromptContext) -> String {
        let mut vars = HashMap::new();
        vars.insert(
            "preamble".to_string(),
            self.prompts.qa.preamble_for(&self.language).to_string(),
        );
        vars.insert("context".to_string(), context.render());
        vars.insert("question".to_string(), query.to_string());

        self.prompts.render_with_custom(&self.prompts.qa.template, &vars)
    }

    /// Answer a query against a transcript.
    ///
    /// On the first query the history restarts with a system turn carrying the
    /// composed prompt; later queries append a user turn. The caller's history
    /// is never modified: the updated history is returned only on success.
    #[instrument(skip(self, table, index, history), fields(history = history.len()))]
    pub async fn answer_query(
        &self,
        query: &str,
        table: &TranscriptTable,
        index: &EmbeddingIndex,
        history: &[ConversationTurn],
        is_first_query: bool,
        max_tokens: usize,
    ) -> Result<ComposedAnswer> {
        let context = self.selector.select(query, table, index, max_tokens).await?;
        let prompt = self.compose_prompt(query, &context);

        let mut updated = if is_first_query {
            vec![ConversationTurn::system(prompt.clone())]
        } else {
            let mut turns = history.to_vec();
            turns.push(ConversationTurn::user(prompt.clone()));
            turns
        };

        info!("Answering query ({:?} mode)", self.mode);
        let answer = match self.mode {
            ResponseMode::Chat => self.completer.complete(CompletionRequest::Chat(&updated)).await?,
            ResponseMode::Completion => {
                self.completer
                    .complete(CompletionRequest::Completion(&prompt))
                    .await?
            }
        };
        debug!("Answer of {} chars from {} segments", answer.len(), context.len());

        updated.push(ConversationTurn::assistant(answer.clone()));

        Ok(ComposedAnswer {
            answer,
            prompt,
            history: updated,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, EmbeddingStrategy};
    use crate::error::TubeqaError;
    use crate::rag::Role;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct UnitQuery;

    #[async_trait]
    impl EmbeddingProvider for UnitQuery {
        fn strategy(&self) -> EmbeddingStrategy {
            EmbeddingStrategy::Local
        }

        async fn embed_passages(&self, texts: &[String], _language: &str) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }

        async fn embed_query(&self, _text: &str, _language: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    /// Records what it was asked and answers with a canned reply.
    #[derive(Default)]
    struct RecordingCompleter {
        chat_calls: Mutex<Vec<usize>>,
        completion_prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Completer for RecordingCompleter {
        async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
            if self.fail {
                return Err(TubeqaError::Upstream("rate limited".to_string()));
            }
            match request {
                CompletionRequest::Chat(turns) => self.chat_calls.lock().unwrap().push(turns.len()),
                CompletionRequest::Completion(prompt) => {
                    self.completion_prompts.lock().unwrap().push(prompt.to_string())
                }
            }
            Ok("The video ends with a goodbye.".to_string())
        }
    }

    fn fixture() -> (TranscriptTable, EmbeddingIndex) {
        let table = TranscriptTable::from_texts("abc123", ["Hello world.", "Goodbye."]);
        let index =
            EmbeddingIndex::build(EmbeddingStrategy::Local, &table, vec![vec![1.0], vec![1.0]])
                .unwrap();
        (table, index)
    }

    fn composer(completer: Arc<RecordingCompleter>, mode: ResponseMode, language: &str) -> AnswerComposer {
        AnswerComposer::new(
            ContextSelector::new(Arc::new(UnitQuery), language),
            completer,
            mode,
            language,
        )
    }

    #[test]
    fn test_compose_prompt_layout() {
        let composer = composer(Arc::new(RecordingCompleter::default()), ResponseMode::Chat, "en");
        let (table, index) = fixture();
        let context = crate::rag::context::select_context(&[1.0], &table, &index, 100);

        let prompt = composer.compose_prompt("How does it end?", &context);
        assert!(prompt.starts_with("Answer the question as truthfully as possible"));
        assert!(prompt.contains("Context:\n\n* Hello world.\n* Goodbye."));
        assert!(prompt.ends_with("\n\n Q: How does it end?\n A:"));
    }

    #[test]
    fn test_compose_prompt_uses_language_preamble() {
        let composer = composer(Arc::new(RecordingCompleter::default()), ResponseMode::Chat, "tr");
        let prompt = composer.compose_prompt("Nasıl bitiyor?", &PromptContext::default());
        assert!(prompt.contains("Bilmiyorum"));
    }

    #[tokio::test]
    async fn test_chat_mode_builds_history() {
        let completer = Arc::new(RecordingCompleter::default());
        let composer = composer(completer.clone(), ResponseMode::Chat, "en");
        let (table, index) = fixture();

        let first = composer
            .answer_query("How does it end?", &table, &index, &[], true, 100)
            .await
            .unwrap();
        assert_eq!(first.history.len(), 2);
        assert_eq!(first.history[0].role, Role::System);
        assert_eq!(first.history[0].content, first.prompt);
        assert_eq!(first.history[1], ConversationTurn::assistant(first.answer.clone()));

        let second = composer
            .answer_query("And the start?", &table, &index, &first.history, false, 100)
            .await
            .unwrap();
        let roles: Vec<Role> = second.history.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant, Role::User, Role::Assistant]);

        // The chat backend sees the whole conversation, without the pending answer
        assert_eq!(*completer.chat_calls.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_first_query_resets_history() {
        let composer = composer(Arc::new(RecordingCompleter::default()), ResponseMode::Chat, "en");
        let (table, index) = fixture();
        let stale = vec![ConversationTurn::user("old"), ConversationTurn::assistant("old")];

        let result = composer
            .answer_query("q", &table, &index, &stale, true, 100)
            .await
            .unwrap();
        assert_eq!(result.history.len(), 2);
        assert_eq!(result.history[0].role, Role::System);
    }

    #[tokio::test]
    async fn test_completion_mode_sends_flat_prompt() {
        let completer = Arc::new(RecordingCompleter::default());
        let composer = composer(completer.clone(), ResponseMode::Completion, "en");
        let (table, index) = fixture();

        let result = composer
            .answer_query("How does it end?", &table, &index, &[], true, 100)
            .await
            .unwrap();

        assert_eq!(*completer.completion_prompts.lock().unwrap(), vec![result.prompt.clone()]);
        assert!(completer.chat_calls.lock().unwrap().is_empty());
        assert_eq!(result.history.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_history_alone() {
        let completer = Arc::new(RecordingCompleter {
            fail: true,
            ..Default::default()
        });
        let composer = composer(completer, ResponseMode::Chat, "en");
        let (table, index) = fixture();
        let history = vec![ConversationTurn::system("s"), ConversationTurn::assistant("a")];

        let err = composer
            .answer_query("q", &table, &index, &history, false, 100)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(history.len(), 2);
    }
}
