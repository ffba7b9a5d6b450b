//! Prompt assembly for Compass.
//!
//! Renders the final completion prompt from the current question, a bounded
//! conversation-history block and a bounded retrieved-context block using a
//! Handlebars template.

pub mod builder;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, DEFAULT_TEMPLATE};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptInput, PromptLimits, PromptTurn};
