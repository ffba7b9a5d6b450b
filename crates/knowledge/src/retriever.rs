//! Retrieval engine: ingestion and nearest-neighbor lookup over one corpus.
//!
//! The engine owns the vector index and the fragment store and is the only
//! code that mutates them, always in lockstep: vectors are inserted first,
//! fragments appended second, and the pair is persisted last. Any failure
//! before the append leaves both untouched.
//!
//! Known gap with the default `rebuild` dimension policy: when the embedding
//! width changes, fragments stored before the change stay in the store but
//! have no vector until `reindex` is run.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingGateway;
use crate::extract::{FileExtractor, TextExtractor};
use crate::fragments::FragmentStore;
use crate::store;
use crate::types::{CorpusStats, IndexChange, IngestOutcome, IngestReport, ScoredFragment, SkipReason};
use crate::vector_index::{InsertOutcome, VectorIndex};
use compass_core::{AppError, AppResult, DimensionPolicy, RetrievalSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ingestion and retrieval over one persisted corpus.
pub struct RetrievalEngine {
    store_path: PathBuf,
    settings: RetrievalSettings,
    gateway: EmbeddingGateway,
    extractor: Arc<dyn TextExtractor>,
    index: VectorIndex,
    fragments: FragmentStore,
}

impl RetrievalEngine {
    /// Load the corpus at `store_path`, or start empty if none exists.
    pub fn open(
        store_path: impl Into<PathBuf>,
        settings: RetrievalSettings,
        gateway: EmbeddingGateway,
    ) -> AppResult<Self> {
        let store_path = store_path.into();
        let (index, fragments) = store::load(&store_path)?;

        tracing::info!(
            "Opened corpus {:?}: {} fragments, {} vectors",
            store_path,
            fragments.count(),
            index.len()
        );

        Ok(Self {
            store_path,
            settings,
            gateway,
            extractor: Arc::new(FileExtractor::new()),
            index,
            fragments,
        })
    }

    /// Replace the text extractor used by `add_file`.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.count()
    }

    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.index.dimension()
    }

    pub fn embeddings_available(&self) -> bool {
        self.gateway.is_available()
    }

    /// Extract a file and ingest its text.
    pub async fn add_file(&mut self, path: &Path) -> AppResult<IngestOutcome> {
        tracing::info!("Ingesting {:?}", path);
        let text = self.extractor.extract(path).await?;
        self.add_document(&text).await
    }

    /// Chunk, embed, index and persist a document.
    ///
    /// Blank text and text that yields no chunks are skipped, not errors.
    ///
    /// # Errors
    /// * `AppError::EmbeddingUnavailable` / `AppError::EmbeddingService` - From the gateway; nothing changed
    /// * `AppError::EmbeddingFailed` - The gateway returned no usable vectors; nothing changed
    /// * `AppError::Persistence` - The corpus file could not be written; the
    ///   in-memory corpus already holds the new fragments and stays usable
    pub async fn add_document(&mut self, text: &str) -> AppResult<IngestOutcome> {
        if text.trim().is_empty() {
            tracing::warn!("No text to ingest; skipping document");
            return Ok(IngestOutcome::Skipped {
                reason: SkipReason::EmptyText,
            });
        }

        let chunks = chunk_text(text, self.settings.chunk_size, self.settings.chunk_overlap)?;
        if chunks.is_empty() {
            tracing::warn!("Document produced no chunks; skipping");
            return Ok(IngestOutcome::Skipped {
                reason: SkipReason::NoChunks,
            });
        }

        let vectors = self.gateway.embed(&chunks).await?;
        if vectors.is_empty() || vectors.len() != chunks.len() {
            return Err(AppError::EmbeddingFailed(format!(
                "Got {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let first_id = self.fragments.count();
        let width = vectors[0].len();

        let change = match self.index.dimension() {
            Some(previous) if previous != width && self.reembed_on_change() && first_id > 0 => {
                let mut all = self.embed_stored_fragments(width).await?;
                all.extend(vectors);
                self.index.rebuild(0, all).map_err(as_embedding_failure)?;

                tracing::info!(
                    "Embedding width changed ({} -> {}); re-embedded {} stored fragments",
                    previous,
                    width,
                    first_id
                );
                IndexChange::Reembedded {
                    previous_dimension: previous,
                    reembedded_fragments: first_id,
                }
            }
            _ => match self.index.insert(first_id, vectors).map_err(as_embedding_failure)? {
                InsertOutcome::Appended { .. } => IndexChange::Appended,
                InsertOutcome::Rebuilt {
                    previous_dimension, ..
                } => {
                    tracing::warn!(
                        "{} previously stored fragments are no longer searchable; run reindex to restore them",
                        first_id
                    );
                    IndexChange::Rebuilt {
                        previous_dimension,
                        unindexed_fragments: first_id,
                    }
                }
            },
        };

        let added = chunks.len();
        self.fragments.append(chunks);
        self.persist()?;

        tracing::info!(
            "Indexed {} fragments ({} total, dimension {})",
            added,
            self.fragments.count(),
            width
        );

        Ok(IngestOutcome::Indexed(IngestReport {
            fragments_added: added,
            total_fragments: self.fragments.count(),
            indexed_vectors: self.index.len(),
            dimension: width,
            change,
        }))
    }

    /// Texts of the fragments nearest to `query`, closest first.
    ///
    /// An empty index, an empty query vector or a query whose width does
    /// not match the index all give an empty list.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<String>> {
        Ok(self
            .retrieve_scored(query, top_k)
            .await?
            .into_iter()
            .map(|f| f.text)
            .collect())
    }

    /// Like `retrieve`, with fragment positions and distances.
    pub async fn retrieve_scored(&self, query: &str, top_k: usize) -> AppResult<Vec<ScoredFragment>> {
        if self.index.is_empty() {
            tracing::debug!("Index is empty; no context to retrieve");
            return Ok(Vec::new());
        }

        let embedded = self.gateway.embed(&[query.to_string()]).await?;
        let Some(query_vector) = embedded.into_iter().next().filter(|v| !v.is_empty()) else {
            tracing::warn!("Query produced no embedding");
            return Ok(Vec::new());
        };

        let k = top_k.min(self.fragments.count());
        let hits = match self.index.search(&query_vector, k) {
            Ok(hits) => hits,
            Err(AppError::IndexDimensionMismatch { expected, actual }) => {
                tracing::warn!(
                    "Query embedding width {} does not match index width {}; run reindex",
                    actual,
                    expected
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let results: Vec<ScoredFragment> = hits
            .into_iter()
            .filter_map(|hit| {
                self.fragments.get(hit.id).map(|text| ScoredFragment {
                    position: hit.id,
                    distance: hit.distance,
                    text: text.to_string(),
                })
            })
            .collect();

        tracing::debug!("Retrieved {} fragments for query", results.len());
        Ok(results)
    }

    /// Re-embed every stored fragment and rebuild the index from scratch.
    ///
    /// Returns the number of fragments indexed.
    pub async fn reindex(&mut self) -> AppResult<usize> {
        if self.fragments.is_empty() {
            self.index.clear();
            self.persist()?;
            return Ok(0);
        }

        let texts = self.fragments.as_slice().to_vec();
        let vectors = self.gateway.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(AppError::EmbeddingFailed(format!(
                "Got {} vectors for {} fragments",
                vectors.len(),
                texts.len()
            )));
        }

        self.index.rebuild(0, vectors).map_err(as_embedding_failure)?;
        self.persist()?;

        tracing::info!("Reindexed {} fragments", texts.len());
        Ok(texts.len())
    }

    /// Corpus statistics.
    pub fn stats(&self) -> CorpusStats {
        let file_size_bytes = std::fs::metadata(&self.store_path)
            .map(|m| m.len())
            .unwrap_or(0);

        CorpusStats {
            store_path: self.store_path.clone(),
            fragments: self.fragments.count(),
            indexed_vectors: self.index.len(),
            unindexed_fragments: self.fragments.count().saturating_sub(self.index.len()),
            dimension: self.index.dimension(),
            file_size_bytes,
        }
    }

    /// Drop the whole corpus, in memory and on disk.
    pub fn reset(&mut self) -> AppResult<()> {
        self.index.clear();
        self.fragments.clear();
        store::remove_if_exists(&self.store_path)?;
        tracing::info!("Reset corpus {:?}", self.store_path);
        Ok(())
    }

    fn reembed_on_change(&self) -> bool {
        self.settings.on_dimension_change == DimensionPolicy::Reembed
    }

    async fn embed_stored_fragments(&self, width: usize) -> AppResult<Vec<Vec<f32>>> {
        let stored = self.gateway.embed(self.fragments.as_slice()).await?;
        if stored.len() != self.fragments.count() || stored.iter().any(|v| v.len() != width) {
            return Err(AppError::EmbeddingFailed(
                "Re-embedding stored fragments returned inconsistent vectors".to_string(),
            ));
        }
        Ok(stored)
    }

    fn persist(&self) -> AppResult<()> {
        store::save(&self.store_path, &self.index, &self.fragments).map_err(|e| {
            tracing::error!("Failed to persist corpus {:?}: {}", self.store_path, e);
            match e {
                AppError::Persistence(_) => e,
                other => AppError::Persistence(other.to_string()),
            }
        })
    }
}

/// Ragged or zero-width batches from the backend are reported as embedding failures.
fn as_embedding_failure(e: AppError) -> AppError {
    match e {
        AppError::IndexDimensionMismatch { expected, actual } => AppError::EmbeddingFailed(format!(
            "Backend returned vectors of mixed width ({} and {})",
            expected, actual
        )),
        AppError::Knowledge(reason) => AppError::EmbeddingFailed(reason),
        other => other,
    }
}
