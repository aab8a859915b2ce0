//! Language model module.
//!
//! This module contains the [`LanguageModel`] abstraction and its HTTP
//! clients for Gemini and OpenAI-compatible endpoints.

mod client;
mod config;
mod error;
mod gemini;
mod openai;

pub use client::LanguageModel;
pub use config::{ModelConfig, ProviderKind};
pub use error::{GenerationError, GenerationErrorKind};
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;

use std::sync::Arc;

/// Builds the client selected by `config.provider`.
///
/// Returns `Ok(None)` for [`ProviderKind::Mock`], meaning the dialogue session
/// should run in mocked mode.
///
/// # Errors
///
/// Returns `GenerationError::invalid_config` when a hosted provider has no
/// API key, or a network error when the HTTP client cannot be created.
pub fn build_model(config: &ModelConfig) -> Result<Option<Arc<dyn LanguageModel>>, GenerationError> {
    let client: Arc<dyn LanguageModel> = match config.provider {
        ProviderKind::Mock => return Ok(None),
        ProviderKind::Gemini => Arc::new(GeminiClient::new(config)?),
        ProviderKind::OpenAI => {
            if config.resolve_api_key().is_empty() {
                return Err(GenerationError::invalid_config(
                    "model.api_key_env",
                    "no OpenAI API key found; set OPENAI_API_KEY",
                ));
            }
            Arc::new(OpenAIClient::new(config)?)
        }
        ProviderKind::Ollama => Arc::new(OpenAIClient::new(config)?),
    };
    Ok(Some(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_model_mock_is_none() {
        assert!(build_model(&ModelConfig::mock()).unwrap().is_none());
    }

    #[test]
    fn build_model_ollama_uses_openai_client() {
        let config = ModelConfig::new(ProviderKind::Ollama, "qwen2.5:7b");

        let model = build_model(&config).unwrap().unwrap();

        assert_eq!(model.provider_name(), "openai");
        assert_eq!(model.model_name(), "qwen2.5:7b");
    }

    #[test]
    fn build_model_gemini_with_direct_key() {
        let config = ModelConfig::default().with_api_key("k");

        let model = build_model(&config).unwrap().unwrap();

        assert_eq!(model.provider_name(), "gemini");
        assert_eq!(model.model_name(), "gemini-flash-latest");
    }
}
