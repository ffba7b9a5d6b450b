//! Question/answer session tying retrieval, memory and completion together.

use crate::memory::{ConversationMemory, Role};
use crate::retriever::RetrievalEngine;
use compass_core::AppResult;
use compass_llm::LlmClient;
use compass_prompt::{build_prompt, PromptInput, PromptLimits, PromptTurn};
use std::sync::Arc;

/// One user's conversation over a corpus.
pub struct ChatSession {
    name: String,
    engine: RetrievalEngine,
    memory: ConversationMemory,
    llm: Arc<dyn LlmClient>,
    limits: PromptLimits,
    top_k: usize,
}

impl ChatSession {
    pub fn new(
        name: impl Into<String>,
        engine: RetrievalEngine,
        memory: ConversationMemory,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            engine,
            memory,
            llm,
            limits: PromptLimits::default(),
            top_k: 3,
        }
    }

    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &RetrievalEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RetrievalEngine {
        &mut self.engine
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Answer a question and record the turn.
    ///
    /// Retrieval problems degrade to an answer without context. A failed
    /// completion is returned as an error and nothing is recorded. Failing to
    /// save the history is logged; the answer is still returned.
    pub async fn ask(&mut self, question: &str, use_rag: bool) -> AppResult<String> {
        let context = if use_rag {
            match self.engine.retrieve(question, self.top_k).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    tracing::warn!("Retrieval failed, answering without context: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let history = self
            .memory
            .get_recent(self.limits.max_history_messages)
            .into_iter()
            .map(|(role, content)| PromptTurn::new(role.as_str(), content))
            .collect();

        let input = PromptInput {
            question: question.to_string(),
            history,
            context,
        };
        let prompt = build_prompt(&input, self.limits)?;

        tracing::debug!(
            "Asking {} ({} context fragments, {} history messages)",
            self.llm.provider_name(),
            prompt.metadata.context_fragments,
            prompt.metadata.history_messages
        );

        let answer = self.llm.generate(&prompt.text).await?;

        for (role, content) in [(Role::User, question), (Role::Assistant, answer.as_str())] {
            if let Err(e) = self.memory.add_message(role, content) {
                tracing::warn!("Failed to save conversation history: {}", e);
            }
        }

        Ok(answer)
    }

    /// Forget the conversation so far.
    pub fn clear_context(&mut self) -> AppResult<()> {
        self.memory.clear()?;
        tracing::info!("Conversation memory cleared for {}", self.name);
        Ok(())
    }
}
