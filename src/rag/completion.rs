//! Language-model backends for answer generation.

use super::{ConversationTurn, Role};
use crate::config::CompletionSettings;
use crate::error::{Result, TubeqaError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, CreateCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// How answers are requested from the model. Fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Chat backend; the whole conversation is sent on every call.
    Chat,
    /// Single-shot completion backend; only the composed prompt is sent.
    Completion,
}

impl ResponseMode {
    /// Turbo mode selects the chat backend.
    pub fn from_turbo(turbo: bool) -> Self {
        if turbo {
            ResponseMode::Chat
        } else {
            ResponseMode::Completion
        }
    }
}

/// Input of a completion call.
#[derive(Debug, Clone, Copy)]
pub enum CompletionRequest<'a> {
    Chat(&'a [ConversationTurn]),
    Completion(&'a str),
}

/// Trait for answer generation backends.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Generate an answer. Any failure is reported as [`TubeqaError::Upstream`].
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;
}

/// OpenAI chat and completion backend.
pub struct OpenAICompleter {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    chat_model: String,
    completion_model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAICompleter {
    pub fn from_settings(settings: &CompletionSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_seconds))?,
            chat_model: settings.chat_model.clone(),
            completion_model: settings.completion_model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_answer_tokens,
        })
    }

    /// Override the chat model.
    pub fn with_chat_model(mut self, model: &str) -> Self {
        self.chat_model = model.to_string();
        self
    }

    fn to_message(turn: &ConversationTurn) -> Result<ChatCompletionRequestMessage> {
        let message: ChatCompletionRequestMessage = match turn.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| TubeqaError::Upstream(e.to_string()))?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| TubeqaError::Upstream(e.to_string()))?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(turn.content.clone())
                .build()
                .map_err(|e| TubeqaError::Upstream(e.to_string()))?
                .into(),
        };
        Ok(message)
    }

    async fn chat(&self, turns: &[ConversationTurn]) -> Result<String> {
        let messages = turns
            .iter()
            .map(Self::to_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| TubeqaError::Upstream(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TubeqaError::Upstream(format!("Failed to generate response: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TubeqaError::Upstream("Empty response from LLM".to_string()))
    }

    async fn completion(&self, prompt: &str) -> Result<String> {
        let request = CreateCompletionRequestArgs::default()
            .model(&self.completion_model)
            .prompt(prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| TubeqaError::Upstream(e.to_string()))?;

        let response = self
            .client
            .completions()
            .create(request)
            .await
            .map_err(|e| TubeqaError::Upstream(format!("Failed to generate response: {}", e)))?;

        response
            .choices
            .first()
            .map(|c| c.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| TubeqaError::Upstream("Empty response from LLM".to_string()))
    }
}

#[async_trait]
impl Completer for OpenAICompleter {
    #[instrument(skip_all)]
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        match request {
            CompletionRequest::Chat(turns) => {
                debug!("Chat completion with {} turns", turns.len());
                self.chat(turns).await
            }
            CompletionRequest::Completion(prompt) => {
                debug!("Text completion, prompt of {} chars", prompt.len());
                self.completion(prompt).await
            }
        }
    }
}
