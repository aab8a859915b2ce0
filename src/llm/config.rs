//! Language model configuration.
//!
//! Selects the provider, model and credentials used by the dialogue session.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The language model backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini `generateContent` API
    #[default]
    Gemini,
    /// OpenAI chat completions API
    OpenAI,
    /// Ollama through its OpenAI-compatible endpoint
    Ollama,
    /// No model; the session answers with a canned reply
    Mock,
}

impl ProviderKind {
    /// Returns the base URL used when none is configured.
    #[must_use]
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("https://generativelanguage.googleapis.com/v1beta"),
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::Mock => None,
        }
    }

    /// Returns the environment variable conventionally holding the API key.
    #[must_use]
    pub fn standard_key_env(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GOOGLE_API_KEY"),
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Ollama | Self::Mock => None,
        }
    }
}

/// Configuration for the language model behind the dialogue session.
///
/// Maps to the `[model]` table of the configuration file:
///
/// ```toml
/// [model]
/// provider = "gemini"
/// model = "gemini-flash-latest"
/// api_key_env = "GOOGLE_API_KEY"
/// timeout_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Which backend to call.
    pub provider: ProviderKind,

    /// Model identifier (e.g. "gemini-flash-latest", "gpt-4o-mini", "qwen2.5:7b").
    pub model: String,

    /// Direct API key value (discouraged - use api_key_env instead).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Custom base URL for the API.
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,

    /// Persona and behaviour policy. The built-in receptionist persona is
    /// used when unset.
    pub system_prompt: Option<String>,
}

impl ModelConfig {
    /// Creates a configuration for the given provider and model.
    #[must_use]
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration that runs without a language model.
    #[must_use]
    pub fn mock() -> Self {
        Self::new(ProviderKind::Mock, "mock")
    }

    /// Sets the API key environment variable.
    #[must_use]
    pub fn with_api_key_env(mut self, env_var: impl Into<String>) -> Self {
        self.api_key_env = Some(env_var.into());
        self
    }

    /// Sets a direct API key (discouraged).
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Returns true if no model will be called.
    #[must_use]
    pub fn is_mock(&self) -> bool {
        self.provider == ProviderKind::Mock
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the configured base URL or the provider default.
    #[must_use]
    pub fn effective_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_string))
            .map(|url| url.trim_end_matches('/').to_string())
    }

    /// Resolves the API key from environment or direct value.
    ///
    /// Resolution order:
    /// 1. `api_key_env` - read from environment variable
    /// 2. Standard env var for the provider (GOOGLE_API_KEY, OPENAI_API_KEY)
    /// 3. `api_key` - direct value in config (discouraged)
    /// 4. Empty string (for Ollama/local providers)
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        let from_env = |name: &str| std::env::var(name).ok().filter(|key| !key.is_empty());

        if let Some(key) = self.api_key_env.as_deref().and_then(from_env) {
            return key;
        }

        if let Some(key) = self.provider.standard_key_env().and_then(from_env) {
            return key;
        }

        self.api_key.clone().unwrap_or_default()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            model: "gemini-flash-latest".to_string(),
            api_key: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: 60,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_gemini_flash() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.model, "gemini-flash-latest");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(!config.is_mock());
    }

    #[test]
    fn effective_base_url_uses_provider_default() {
        let config = ModelConfig::new(ProviderKind::Ollama, "qwen2.5:7b");
        assert_eq!(
            config.effective_base_url().as_deref(),
            Some("http://localhost:11434/v1")
        );
    }

    #[test]
    fn effective_base_url_strips_trailing_slash() {
        let config = ModelConfig::new(ProviderKind::OpenAI, "gpt-4o-mini")
            .with_base_url("http://gateway.local/v1/");
        assert_eq!(
            config.effective_base_url().as_deref(),
            Some("http://gateway.local/v1")
        );
    }

    #[test]
    fn resolve_api_key_prefers_explicit_env() {
        std::env::set_var("FURHAT_DIALOGUE_TEST_KEY", "from-env");
        let config = ModelConfig::new(ProviderKind::Ollama, "m")
            .with_api_key_env("FURHAT_DIALOGUE_TEST_KEY")
            .with_api_key("direct");

        assert_eq!(config.resolve_api_key(), "from-env");
        std::env::remove_var("FURHAT_DIALOGUE_TEST_KEY");
    }

    #[test]
    fn resolve_api_key_falls_back_to_direct_value() {
        let config = ModelConfig::new(ProviderKind::Ollama, "m")
            .with_api_key_env("FURHAT_DIALOGUE_UNSET_KEY_VAR")
            .with_api_key("direct");

        assert_eq!(config.resolve_api_key(), "direct");
    }

    #[test]
    fn mock_config() {
        let config = ModelConfig::mock();
        assert!(config.is_mock());
        assert_eq!(config.effective_base_url(), None);
    }

    #[test]
    fn provider_kind_parses_lowercase() {
        let kind: ProviderKind = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(kind, ProviderKind::Ollama);
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAI);
    }
}
