//! Embedding gateway.
//!
//! Wraps the configured backend, splits inputs into batches and makes sure
//! callers get either one vector per input or an error, never a partial
//! result.

pub mod provider;
pub mod providers;

pub use provider::{create_embedder, Embedder};

use compass_core::{AppError, AppResult, EmbeddingSettings};
use std::sync::Arc;

/// Batching front for an optional embedding backend.
#[derive(Debug, Clone)]
pub struct EmbeddingGateway {
    embedder: Option<Arc<dyn Embedder>>,
    batch_size: usize,
}

impl EmbeddingGateway {
    /// Wrap a backend. A batch size of zero is treated as one.
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            embedder: Some(embedder),
            batch_size: batch_size.max(1),
        }
    }

    /// A gateway with no backend; every non-empty call fails.
    pub fn unavailable() -> Self {
        Self {
            embedder: None,
            batch_size: 1,
        }
    }

    /// Build the gateway for the configured backend.
    ///
    /// A backend that cannot be set up for lack of credentials is not fatal:
    /// the gateway is returned without a backend and a warning is logged.
    pub fn from_settings(settings: &EmbeddingSettings, api_key: Option<&str>) -> AppResult<Self> {
        match create_embedder(settings, api_key) {
            Ok(Some(embedder)) => {
                tracing::debug!(
                    "Embedding backend ready: provider={}, model={}",
                    embedder.provider_name(),
                    embedder.model_name()
                );
                Ok(Self::new(embedder, settings.batch_size))
            }
            Ok(None) => {
                tracing::info!("Embeddings disabled (provider: none)");
                Ok(Self::unavailable())
            }
            Err(AppError::EmbeddingUnavailable(reason)) => {
                tracing::warn!("No embedding backend initialized: {}", reason);
                Ok(Self::unavailable())
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_available(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Provider and model of the backend, if any.
    pub fn describe(&self) -> Option<(String, String)> {
        self.embedder
            .as_ref()
            .map(|e| (e.provider_name().to_string(), e.model_name().to_string()))
    }

    /// Embed `texts` in batches of at most `batch_size`.
    ///
    /// Empty input returns an empty list without touching the backend.
    ///
    /// # Errors
    /// * `AppError::EmbeddingUnavailable` - No backend is configured
    /// * `AppError::EmbeddingService` - A batch failed, returned the wrong number
    ///   of vectors, or returned vectors whose width differs from the width the
    ///   backend declares
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embedder = self.embedder.as_ref().ok_or_else(|| {
            AppError::EmbeddingUnavailable(
                "Embedding client not initialized; configure a provider and API key".to_string(),
            )
        })?;

        tracing::debug!(
            "Embedding {} texts with {} (model: {}, batch size: {})",
            texts.len(),
            embedder.provider_name(),
            embedder.model_name(),
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            let embedded = embedder.embed_batch(batch).await.map_err(|e| match e {
                AppError::EmbeddingUnavailable(_) | AppError::EmbeddingService(_) => e,
                other => AppError::EmbeddingService(other.to_string()),
            })?;

            if embedded.len() != batch.len() {
                return Err(AppError::EmbeddingService(format!(
                    "Batch {} returned {} vectors for {} texts",
                    batch_no,
                    embedded.len(),
                    batch.len()
                )));
            }

            if let Some(declared) = embedder.dimensions() {
                if let Some(bad) = embedded.iter().find(|v| v.len() != declared) {
                    return Err(AppError::EmbeddingService(format!(
                        "Batch {} returned a vector of width {}; {} declares {}",
                        batch_no,
                        bad.len(),
                        embedder.provider_name(),
                        declared
                    )));
                }
            }

            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}
