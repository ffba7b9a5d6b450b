//! Embedding backend trait and factory.

use super::providers::{GeminiEmbedder, OllamaEmbedder, TrigramEmbedder};
use compass_core::{AppError, AppResult, EmbeddingSettings};
use std::sync::Arc;

/// A backend that turns texts into vectors.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g. "gemini", "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model_name(&self) -> &str;

    /// Vector width when known ahead of the first call.
    ///
    /// When declared, the gateway rejects vectors of any other width.
    fn dimensions(&self) -> Option<usize>;

    /// Embed one batch; returns exactly one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;
}

/// Build the configured embedding backend.
///
/// Returns `Ok(None)` for the "none" provider.
///
/// # Errors
/// * `AppError::EmbeddingUnavailable` - The backend needs an API key and none was resolved
/// * `AppError::Config` - Unknown provider name
pub fn create_embedder(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<Option<Arc<dyn Embedder>>> {
    match settings.provider.as_str() {
        "none" => Ok(None),

        "trigram" => Ok(Some(Arc::new(TrigramEmbedder::new(settings.dimensions)?))),

        "gemini" | "google" => {
            let embedder = GeminiEmbedder::from_settings(settings, api_key)?;
            Ok(Some(Arc::new(embedder)))
        }

        "ollama" => Ok(Some(Arc::new(OllamaEmbedder::from_settings(settings)?))),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, ollama, trigram, none",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_trigram_embedder() {
        let embedder = create_embedder(&settings("trigram"), None).unwrap().unwrap();
        assert_eq!(embedder.provider_name(), "trigram");
        assert_eq!(embedder.dimensions(), Some(384));
    }

    #[test]
    fn test_none_provider() {
        assert!(create_embedder(&settings("none"), None).unwrap().is_none());
    }

    #[test]
    fn test_gemini_without_key_is_unavailable() {
        let result = create_embedder(&settings("gemini"), None);
        assert!(matches!(result, Err(AppError::EmbeddingUnavailable(_))));
    }

    #[test]
    fn test_gemini_with_key() {
        let embedder = create_embedder(&settings("gemini"), Some("test-key"))
            .unwrap()
            .unwrap();
        assert_eq!(embedder.provider_name(), "gemini");
        assert_eq!(embedder.model_name(), "gemini-embedding-001");
    }

    #[test]
    fn test_unknown_provider() {
        let result = create_embedder(&settings("word2vec"), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }
}
