//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why an ingestion call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The document contained no text
    EmptyText,

    /// Chunking produced no fragments
    NoChunks,
}

/// How the vector index changed during an ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum IndexChange {
    /// Vectors were appended to the existing index
    Appended,

    /// The new batch had a different width; older fragments are now unindexed
    Rebuilt {
        previous_dimension: usize,
        unindexed_fragments: usize,
    },

    /// The new batch had a different width; every stored fragment was re-embedded
    Reembedded {
        previous_dimension: usize,
        reembedded_fragments: usize,
    },
}

/// Result of a successful ingestion that added fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Fragments added by this call
    pub fragments_added: usize,

    /// Fragments in the store afterwards
    pub total_fragments: usize,

    /// Vectors in the index afterwards
    pub indexed_vectors: usize,

    /// Index dimensionality afterwards
    pub dimension: usize,

    /// What happened to the index
    pub change: IndexChange,
}

/// Outcome of `add_document`.
///
/// Skips are normal results, not errors; failures come back as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum IngestOutcome {
    Skipped { reason: SkipReason },
    Indexed(IngestReport),
}

impl IngestOutcome {
    /// Fragments added by this call (zero for skips).
    pub fn fragments_added(&self) -> usize {
        match self {
            IngestOutcome::Skipped { .. } => 0,
            IngestOutcome::Indexed(report) => report.fragments_added,
        }
    }
}

/// A retrieved fragment with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredFragment {
    /// Position of the fragment in the store
    pub position: usize,

    /// Euclidean distance to the query vector
    pub distance: f32,

    /// Fragment text
    pub text: String,
}

/// Statistics for a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    /// Corpus file
    pub store_path: PathBuf,

    /// Fragments stored
    pub fragments: usize,

    /// Vectors in the index
    pub indexed_vectors: usize,

    /// Stored fragments with no vector (left behind by a rebuild)
    pub unindexed_fragments: usize,

    /// Index dimensionality, if any vector was inserted
    pub dimension: Option<usize>,

    /// Size of the corpus file on disk
    pub file_size_bytes: u64,
}
