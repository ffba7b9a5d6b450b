//! Retrieval-and-memory subsystem.
//!
//! Turns raw documents into searchable vectors, keeps a vector index aligned
//! with its fragments across incremental additions, answers exact
//! nearest-neighbor queries, and keeps a bounded, persisted conversation log
//! per user.
//!
//! One [`RetrievalEngine`] and one [`ConversationMemory`] belong to a single
//! session. Nothing here locks files: two engines ingesting into the same
//! store path at the same time is undefined behavior and must be prevented by
//! the caller.

pub mod chunker;
pub mod embeddings;
pub mod extract;
pub mod fragments;
pub mod memory;
pub mod retriever;
pub mod session;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_embedder, Embedder, EmbeddingGateway};
pub use extract::{DocumentKind, FileExtractor, TextExtractor};
pub use fragments::FragmentStore;
pub use memory::{ConversationMemory, ConversationMessage, Role};
pub use retriever::RetrievalEngine;
pub use session::ChatSession;
pub use types::{CorpusStats, IngestOutcome, IngestReport, IndexChange, ScoredFragment, SkipReason};
pub use vector_index::{InsertOutcome, SearchHit, VectorIndex};

use compass_core::{AppConfig, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Open the retrieval engine described by the configuration.
///
/// The embedding backend is chosen here, once. A backend that cannot be
/// constructed (for example a missing API key) leaves the engine usable
/// without embeddings: ingestion and retrieval then report
/// `EmbeddingUnavailable`.
pub fn open_engine(config: &AppConfig) -> AppResult<RetrievalEngine> {
    let api_key = config.resolve_embedding_api_key();
    let gateway = EmbeddingGateway::from_settings(&config.embedding, api_key.as_deref())?;
    RetrievalEngine::open(config.store_path(), config.retrieval.clone(), gateway)
}

/// Open the conversation memory for a user key.
pub fn open_memory(config: &AppConfig, user: Option<&str>) -> AppResult<ConversationMemory> {
    ConversationMemory::open(config.history_path(user), config.memory.max_turns)
}

/// Expand files and directories into the documents the extractor can read.
///
/// Directories are walked recursively; files with unsupported extensions
/// inside them are skipped, while explicitly named files are always kept so
/// the extractor can report why they fail.
pub fn collect_documents(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut documents = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_supported(p))
                .collect();
            found.sort();
            documents.extend(found);
        } else {
            documents.push(path.clone());
        }
    }

    tracing::debug!("Collected {} documents from {} paths", documents.len(), paths.len());
    documents
}

fn is_supported(path: &Path) -> bool {
    DocumentKind::from_path(path) != DocumentKind::Unsupported
}
