//! Corpus persistence.
//!
//! The vector index and the fragment list are written together into one
//! bincode file so they can never drift apart on disk. Writes go to a
//! temporary file in the same directory which is then renamed over the
//! target; an interrupted save leaves the previous file intact.

use crate::fragments::FragmentStore;
use crate::vector_index::VectorIndex;
use compass_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Bumped whenever the on-disk layout changes.
pub const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoreFileRef<'a> {
    version: u32,
    index: &'a VectorIndex,
    fragments: &'a FragmentStore,
}

#[derive(Deserialize)]
struct StoreFile {
    version: u32,
    index: VectorIndex,
    fragments: FragmentStore,
}

/// Write index and fragments to `path`.
pub fn save(path: &Path, index: &VectorIndex, fragments: &FragmentStore) -> AppResult<()> {
    let file = StoreFileRef {
        version: STORE_FORMAT_VERSION,
        index,
        fragments,
    };

    let bytes = bincode::serialize(&file)
        .map_err(|e| AppError::Persistence(format!("Failed to encode corpus: {}", e)))?;

    write_atomic(path, &bytes)?;

    tracing::debug!(
        "Saved corpus to {:?} ({} fragments, {} vectors, {} bytes)",
        path,
        fragments.count(),
        index.len(),
        bytes.len()
    );

    Ok(())
}

/// Read index and fragments from `path`.
///
/// A missing file is an empty corpus.
pub fn load(path: &Path) -> AppResult<(VectorIndex, FragmentStore)> {
    if !path.exists() {
        tracing::debug!("No corpus at {:?}, starting empty", path);
        return Ok((VectorIndex::new(), FragmentStore::new()));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Persistence(format!("Failed to read {:?}: {}", path, e)))?;

    let file: StoreFile = bincode::deserialize(&bytes)
        .map_err(|e| AppError::Persistence(format!("Corrupt corpus file {:?}: {}", path, e)))?;

    if file.version != STORE_FORMAT_VERSION {
        return Err(AppError::Persistence(format!(
            "Unsupported corpus version {} in {:?} (expected {})",
            file.version, path, STORE_FORMAT_VERSION
        )));
    }

    if !file.index.is_consistent_with(file.fragments.count()) {
        return Err(AppError::Persistence(format!(
            "Corpus file {:?} is inconsistent: index refers to missing fragments",
            path
        )));
    }

    tracing::debug!(
        "Loaded corpus from {:?} ({} fragments, {} vectors)",
        path,
        file.fragments.count(),
        file.index.len()
    );

    Ok((file.index, file.fragments))
}

/// Delete the file at `path` if present.
pub fn remove_if_exists(path: &Path) -> AppResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Persistence(format!(
            "Failed to remove {:?}: {}",
            path, e
        ))),
    }
}

/// Replace `path` with `bytes` through a temporary sibling file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(parent).map_err(|e| {
        AppError::Persistence(format!("Failed to create directory {:?}: {}", parent, e))
    })?;

    let persist_err =
        |e: std::io::Error| AppError::Persistence(format!("Failed to write {:?}: {}", path, e));

    let mut tmp = NamedTempFile::new_in(parent).map_err(persist_err)?;
    tmp.write_all(bytes).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;

    Ok(())
}
