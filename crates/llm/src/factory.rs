//! LLM provider factory.
//!
//! Resolves the configured provider into one concrete client at startup.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use compass_core::{AppError, AppResult, LlmSettings};
use std::sync::Arc;

/// Create an LLM client from the completion settings.
///
/// # Arguments
/// * `settings` - Completion backend settings (provider, model, endpoint)
/// * `api_key` - API key already resolved from configuration
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key
/// is missing.
pub fn create_client(settings: &LlmSettings, api_key: Option<&str>) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let client = OllamaClient::from_settings(settings)?;
            Ok(Arc::new(client))
        }
        "gemini" | "google" => {
            let client = GeminiClient::from_settings(settings, api_key)?;
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!(
            "Unknown provider: {}",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> LlmSettings {
        LlmSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&settings("ollama"), None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client(&settings("gemini"), None) {
            Err(err) => assert!(err.to_string().contains("requires an API key")),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
    }

    #[test]
    fn test_create_gemini_client() {
        let client = create_client(&settings("gemini"), Some("key")).unwrap();
        assert_eq!(client.provider_name(), "gemini");
        assert_eq!(client.model_name(), "gemini-2.5-flash-lite");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client(&settings("unknown"), None) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
