//! OpenAI-compatible API client.
//!
//! HTTP client for communicating with OpenAI-compatible APIs including
//! OpenAI, Ollama, vLLM, LocalAI, and other compatible endpoints.

use crate::llm::client::LanguageModel;
use crate::llm::config::ModelConfig;
use crate::llm::error::GenerationError;
use crate::messages::{Message, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for OpenAI-compatible APIs (OpenAI, Ollama, vLLM, LocalAI, etc.).
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    /// HTTP client
    client: Client,
    /// Base URL for the API
    base_url: String,
    /// API key (optional for local providers like Ollama)
    api_key: Option<String>,
    /// Model name
    model: String,
    /// Maximum tokens to generate
    max_tokens: Option<u32>,
    /// Request timeout, reported back on timeout errors
    timeout: Duration,
}

/// Request body for OpenAI chat completions API.
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// A message in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

/// Non-streaming response from OpenAI API.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

/// A choice in the response.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChoice {
    message: OpenAIMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Error response from OpenAI API.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    message: String,
}

impl OpenAIClient {
    /// Creates a new OpenAI-compatible client.
    ///
    /// The API key is optional; local providers such as Ollama accept
    /// unauthenticated requests.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::invalid_config` if no base URL is known, or
    /// `GenerationError::network` if the HTTP client cannot be created.
    pub fn new(config: &ModelConfig) -> Result<Self, GenerationError> {
        let base_url = config.effective_base_url().ok_or_else(|| {
            GenerationError::invalid_config("model.base_url", "no base URL configured")
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenerationError::network(format!("failed to create HTTP client: {}", e)))?;

        let api_key = config.resolve_api_key();
        let api_key = if api_key.is_empty() {
            None
        } else {
            Some(api_key)
        };

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }

    /// Returns the chat completions endpoint URL.
    fn chat_completions_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Builds the message list: system prompt, prior turns, then the new user turn.
    fn convert_messages(
        system_prompt: &str,
        history: &[Message],
        user_text: &str,
    ) -> Vec<OpenAIMessage> {
        let turn = |role: &str, content: &str| OpenAIMessage {
            role: role.to_string(),
            content: Some(content.to_string()),
        };

        std::iter::once(turn("system", system_prompt))
            .chain(history.iter().map(|msg| match msg.role {
                MessageRole::User => turn("user", &msg.content),
                MessageRole::Assistant => turn("assistant", &msg.content),
            }))
            .chain(std::iter::once(turn("user", user_text)))
            .collect()
    }

    /// Extracts the reply text from a completion.
    fn extract_text(response: ChatCompletionResponse) -> Result<String, GenerationError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::empty_response(Some("no choices".to_string())))?;

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GenerationError::empty_response(choice.finish_reason)),
        }
    }

    /// Parses an error response from the API.
    async fn parse_error_response(&self, response: reqwest::Response) -> GenerationError {
        let status = response.status();
        let status_code = status.as_u16();

        // Check for rate limit
        if status_code == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return GenerationError::rate_limited(Duration::from_secs(retry_after));
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<OpenAIErrorResponse>(&error_body) {
            let detail = api_error.error;
            let code = detail
                .code
                .as_ref()
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            let error_type = detail.error_type.as_deref().unwrap_or("unknown");

            if status_code == 401
                || matches!(error_type, "authentication_error" | "invalid_api_key")
                || code == "invalid_api_key"
            {
                GenerationError::authentication_failed(detail.message)
            } else {
                GenerationError::api_error(status_code, detail.message)
            }
        } else {
            GenerationError::api_error(
                status_code,
                if error_body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    error_body
                },
            )
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(system_prompt, history, user_text),
            max_tokens: self.max_tokens,
            stream: false,
        };

        let mut request = self
            .client
            .post(self.chat_completions_endpoint())
            .header("content-type", "application/json")
            .json(&request_body);

        if let Some(ref api_key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::timeout(self.timeout)
            } else {
                GenerationError::network(format!("request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            return Err(self.parse_error_response(response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::parse_error(format!("failed to parse response: {}", e)))?;

        Self::extract_text(completion)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::config::ProviderKind;

    #[test]
    fn new_for_ollama_needs_no_key() {
        let config = ModelConfig::new(ProviderKind::Ollama, "qwen2.5:7b")
            .with_api_key_env("FURHAT_DIALOGUE_UNSET_OLLAMA_KEY");

        let client = OpenAIClient::new(&config).unwrap();

        assert!(client.api_key.is_none());
        assert_eq!(
            client.chat_completions_endpoint(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn convert_messages_wraps_history() {
        let history = vec![Message::user("hi"), Message::assistant("[Smile] hello")];

        let messages = OpenAIClient::convert_messages("persona", &history, "how are you?");

        let roles: Vec<_> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content.as_deref(), Some("persona"));
        assert_eq!(messages[3].content.as_deref(), Some("how are you?"));
    }

    #[test]
    fn extract_text_returns_first_choice() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"id": "c1", "choices": [{"index": 0, "message": {"role": "assistant", "content": "[Nod] Sure."}, "finish_reason": "stop"}]}"#,
        )
        .unwrap();

        assert_eq!(OpenAIClient::extract_text(response).unwrap(), "[Nod] Sure.");
    }

    #[test]
    fn extract_text_rejects_null_content() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": null}, "finish_reason": "length"}]}"#,
        )
        .unwrap();

        let err = OpenAIClient::extract_text(response).unwrap_err();
        assert_eq!(
            err,
            GenerationError::empty_response(Some("length".to_string()))
        );
    }

    #[test]
    fn request_omits_unset_max_tokens() {
        let request = ChatCompletionRequest {
            model: "m".to_string(),
            messages: OpenAIClient::convert_messages("s", &[], "u"),
            max_tokens: None,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["stream"], false);
    }
}
