//! Prompt types.

use serde::{Deserialize, Serialize};

/// One prior message shown to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptTurn {
    /// "user" or "assistant"
    pub role: String,

    /// Message text
    pub content: String,
}

impl PromptTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Everything the template needs for one question.
#[derive(Debug, Clone, Default)]
pub struct PromptInput {
    /// The current question
    pub question: String,

    /// Prior turns, oldest first
    pub history: Vec<PromptTurn>,

    /// Retrieved fragments, most relevant first
    pub context: Vec<String>,
}

/// Bounds applied to the history and context blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    /// Most recent messages kept in the history block; a question and its
    /// answer are two messages
    pub max_history_messages: usize,

    /// Character budget for the joined context block
    pub max_context_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_history_messages: 10,
            max_context_chars: 4000,
        }
    }
}

/// A rendered prompt ready for the completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub text: String,

    /// What went into it
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a rendered prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuiltPromptMetadata {
    /// Messages included in the history block
    pub history_messages: usize,

    /// Fragments included in the context block
    pub context_fragments: usize,

    /// Whether the context budget cut fragments off
    pub context_truncated: bool,
}
