//! Gemini embedding backend.
//!
//! Sends a whole batch in one `models/{model}:batchEmbedContents` call.

use crate::embeddings::Embedder;
use async_trait::async_trait;
use compass_core::{AppError, AppResult, EmbeddingSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

/// Gemini embedding client.
#[derive(Debug)]
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    /// "models/{model}", as the batch API wants it per request
    model_path: String,
    api_key: String,
    task_type: String,
}

impl GeminiEmbedder {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// * `AppError::EmbeddingUnavailable` - If no API key was resolved
    pub fn from_settings(settings: &EmbeddingSettings, api_key: Option<&str>) -> AppResult<Self> {
        let api_key = api_key.filter(|key| !key.trim().is_empty()).ok_or_else(|| {
            AppError::EmbeddingUnavailable(format!(
                "Gemini embeddings require an API key (set {})",
                settings.api_key_env.as_deref().unwrap_or("COMPASS_API_KEY")
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::EmbeddingUnavailable(format!("Failed to create HTTP client for Gemini: {}", e))
            })?;

        let model = settings.model.trim_start_matches("models/").to_string();

        Ok(Self {
            client,
            base_url: settings
                .endpoint
                .as_deref()
                .unwrap_or(DEFAULT_GEMINI_URL)
                .trim_end_matches('/')
                .to_string(),
            model_path: format!("models/{}", model),
            model,
            api_key: api_key.to_string(),
            task_type: settings.task_type.clone(),
        })
    }

    fn build_request<'a>(&'a self, texts: &'a [String]) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model_path,
                    content: Content {
                        parts: [Part { text }],
                    },
                    task_type: &self.task_type,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> Option<usize> {
        None
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "gemini", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/{}:batchEmbedContents", self.base_url, self.model_path);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(texts))
            .send()
            .await
            .map_err(|e| AppError::EmbeddingService(format!("Failed to send request to Gemini: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::EmbeddingService(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::EmbeddingService(format!("Failed to parse Gemini response: {}", e)))?;

        debug!("Received {} embeddings", body.embeddings.len());

        Ok(body.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder() -> GeminiEmbedder {
        GeminiEmbedder::from_settings(&EmbeddingSettings::default(), Some("test-key")).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let embedder = embedder();
        let texts = vec!["first".to_string(), "second".to_string()];
        let json = serde_json::to_value(embedder.build_request(&texts)).unwrap();

        assert_eq!(json["requests"].as_array().unwrap().len(), 2);
        assert_eq!(json["requests"][0]["model"], "models/gemini-embedding-001");
        assert_eq!(json["requests"][0]["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(json["requests"][1]["content"]["parts"][0]["text"], "second");
    }

    #[test]
    fn test_parse_response() {
        let body: BatchEmbedResponse = serde_json::from_str(
            r#"{"embeddings":[{"values":[0.1,0.2]},{"values":[0.3,0.4]}]}"#,
        )
        .unwrap();
        assert_eq!(body.embeddings.len(), 2);
        assert_eq!(body.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[test]
    fn test_model_prefix_normalized() {
        let settings = EmbeddingSettings {
            model: "models/text-embedding-004".to_string(),
            ..Default::default()
        };
        let embedder = GeminiEmbedder::from_settings(&settings, Some("k")).unwrap();
        assert_eq!(embedder.model_name(), "text-embedding-004");
        assert_eq!(embedder.model_path, "models/text-embedding-004");
    }

    #[test]
    fn test_blank_key_rejected() {
        let result = GeminiEmbedder::from_settings(&EmbeddingSettings::default(), Some("  "));
        assert!(matches!(result, Err(AppError::EmbeddingUnavailable(_))));
    }
}
