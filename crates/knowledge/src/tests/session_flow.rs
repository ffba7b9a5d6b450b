//! Question/answer turns through `ChatSession`.

use super::fakes::{gateway, HashEmbedder, RecordingLlm};
use crate::embeddings::EmbeddingGateway;
use crate::memory::{ConversationMemory, Role};
use crate::retriever::RetrievalEngine;
use crate::session::ChatSession;
use compass_core::{AppError, RetrievalSettings};
use compass_prompt::PromptLimits;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

fn session(temp: &TempDir, gateway: EmbeddingGateway, llm: Arc<RecordingLlm>) -> ChatSession {
    let engine = RetrievalEngine::open(
        temp.path().join("store.bin"),
        RetrievalSettings::default(),
        gateway,
    )
    .unwrap();
    let memory = ConversationMemory::open(temp.path().join("chat_history.json"), 6).unwrap();
    ChatSession::new("test", engine, memory, llm)
}

#[tokio::test]
async fn test_ask_records_turn() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, gateway(&HashEmbedder::new(8)), llm.clone());

    let answer = session.ask("What is a borrow?", true).await.unwrap();
    assert_eq!(answer, "answer #1");

    let recent = session.memory().get_recent(2);
    assert_eq!(recent[0], (Role::User, "What is a borrow?".to_string()));
    assert_eq!(recent[1], (Role::Assistant, "answer #1".to_string()));
}

#[tokio::test]
async fn test_context_and_history_reach_prompt() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, gateway(&HashEmbedder::new(8)), llm.clone());

    session
        .engine_mut()
        .add_document("The borrow checker enforces aliasing rules.")
        .await
        .unwrap();

    session.ask("first question", true).await.unwrap();
    session.ask("second question", true).await.unwrap();

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains("The borrow checker enforces aliasing rules."));
    assert!(prompts[1].contains("first question"));
    assert!(prompts[1].contains("answer #1"));
}

#[tokio::test]
async fn test_no_rag_skips_retrieval() {
    let temp = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(8);
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, gateway(&embedder), llm.clone());

    session
        .engine_mut()
        .add_document("Fragment that should not appear.")
        .await
        .unwrap();
    let calls_after_ingest = embedder.calls.load(Ordering::SeqCst);

    session.ask("question", false).await.unwrap();

    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_ingest);
    assert!(!llm.prompts.lock().unwrap()[0].contains("Fragment that should not appear."));
}

#[tokio::test]
async fn test_retrieval_failure_degrades_to_no_context() {
    let temp = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(8);
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, gateway(&embedder), llm.clone());

    session
        .engine_mut()
        .add_document("Some indexed knowledge.")
        .await
        .unwrap();
    embedder.fail.store(true, Ordering::SeqCst);

    let answer = session.ask("still answer me", true).await.unwrap();
    assert_eq!(answer, "answer #1");

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains("still answer me"));
    assert!(!prompts[0].contains("Some indexed knowledge."));
}

#[tokio::test]
async fn test_prompt_history_counts_messages() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, gateway(&HashEmbedder::new(8)), llm.clone()).with_limits(
        PromptLimits {
            max_history_messages: 2,
            ..Default::default()
        },
    );

    session.ask("first question", false).await.unwrap();
    session.ask("second question", false).await.unwrap();
    session.ask("third question", false).await.unwrap();

    // Two messages are exactly one exchange
    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[2].contains("second question"));
    assert!(prompts[2].contains("answer #2"));
    assert!(!prompts[2].contains("first question"));
    assert!(!prompts[2].contains("answer #1"));
}

#[tokio::test]
async fn test_unavailable_embeddings_still_answer() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, EmbeddingGateway::unavailable(), llm);

    assert!(session.ask("hello", true).await.is_ok());
}

#[tokio::test]
async fn test_completion_failure_records_nothing() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    llm.fail.store(true, Ordering::SeqCst);
    let mut session = session(&temp, gateway(&HashEmbedder::new(8)), llm);

    let err = session.ask("hello", true).await.unwrap_err();
    assert!(matches!(err, AppError::Llm(_)));
    assert!(session.memory().is_empty());
}

#[tokio::test]
async fn test_clear_context() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, gateway(&HashEmbedder::new(8)), llm);

    session.ask("hello", false).await.unwrap();
    let history_file = session.memory().path().to_path_buf();
    assert!(history_file.exists());

    session.clear_context().unwrap();
    assert!(session.memory().is_empty());
    assert!(!history_file.exists());
    session.clear_context().unwrap();
}

#[tokio::test]
async fn test_history_bounded_across_turns() {
    let temp = TempDir::new().unwrap();
    let llm = Arc::new(RecordingLlm::default());
    let mut session = session(&temp, gateway(&HashEmbedder::new(8)), llm);

    for i in 0..5 {
        session.ask(&format!("q{}", i), false).await.unwrap();
    }

    assert_eq!(session.memory().len(), 6);
    let reopened = ConversationMemory::open(temp.path().join("chat_history.json"), 6).unwrap();
    assert_eq!(reopened.messages()[0].content, "q2");
}
