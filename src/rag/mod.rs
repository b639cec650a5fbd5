//! RAG (Retrieval-Augmented Generation) over a single transcript.
//!
//! [`ContextSelector`] picks the transcript segments relevant to a question
//! under a token budget; [`AnswerComposer`] turns them into a prompt, calls the
//! language model through a [`Completer`] and returns the updated conversation.

mod completion;
pub mod context;
mod response;

pub use completion::{Completer, CompletionRequest, OpenAICompleter, ResponseMode};
pub use context::{ContextSegment, ContextSelector, PromptContext, SEPARATOR};
pub use response::{AnswerComposer, ComposedAnswer};

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message of the conversation kept by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serialization() {
        let turn = ConversationTurn::assistant("Goodbye.");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Goodbye."}"#);
    }
}
