//! Text chunking with configurable size and overlap.
//!
//! Sizes are measured in characters. Splitting prefers semantic boundaries
//! (paragraphs, then lines, sentences, words) before falling back to raw
//! characters, so fragments rarely cut a word in half.

use compass_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

/// Chunk text into overlapping fragments.
///
/// Returns an empty list for blank text. Fragments are trimmed; none is
/// longer than `chunk_size` characters.
///
/// # Errors
/// `AppError::Config` if `overlap >= chunk_size` or `chunk_size == 0`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    if chunk_size == 0 {
        return Err(AppError::Config("Chunk size must be at least 1".to_string()));
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunk configuration: {}", e)))?;

    let splitter = TextSplitter::new(config);
    let chunks: Vec<String> = splitter
        .chunks(text)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(String::from)
        .collect();

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}
