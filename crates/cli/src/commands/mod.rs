//! Command handlers for the Compass CLI.

pub mod ask;
pub mod chat;
pub mod history;
pub mod learn;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use history::{ClearCommand, HistoryCommand};
pub use learn::{LearnCommand, ReindexCommand};
pub use stats::{ResetCommand, StatsCommand};

use compass_core::{AppConfig, AppResult};
use compass_knowledge::{open_engine, open_memory, ChatSession, EmbeddingGateway, RetrievalEngine};
use compass_llm::create_client;
use compass_prompt::PromptLimits;

/// Build a full question/answer session for one user key.
pub(crate) fn open_session(config: &AppConfig, user: Option<&str>) -> AppResult<ChatSession> {
    let llm = create_client(&config.llm, config.resolve_llm_api_key().as_deref())?;
    let engine = open_engine(config)?;
    let memory = open_memory(config, user)?;

    tracing::debug!(
        "Session ready: llm={}/{}, history={:?}",
        llm.provider_name(),
        llm.model_name(),
        memory.path()
    );

    let limits = PromptLimits {
        max_history_messages: config.memory.prompt_messages,
        ..PromptLimits::default()
    };

    Ok(ChatSession::new(user.unwrap_or("default"), engine, memory, llm)
        .with_limits(limits)
        .with_top_k(config.retrieval.top_k))
}

/// Open the corpus without an embedding backend, for commands that only
/// inspect or delete it.
pub(crate) fn open_corpus(config: &AppConfig) -> AppResult<RetrievalEngine> {
    RetrievalEngine::open(
        config.store_path(),
        config.retrieval.clone(),
        EmbeddingGateway::unavailable(),
    )
}
