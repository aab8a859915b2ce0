//! Google Gemini API client.
//!
//! Non-streaming client for the `models/{model}:generateContent` endpoint.

use crate::llm::client::LanguageModel;
use crate::llm::config::ModelConfig;
use crate::llm::error::GenerationError;
use crate::messages::{Message, MessageRole};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    /// HTTP client
    client: Client,
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    base_url: String,
    /// API key sent in the `x-goog-api-key` header
    api_key: String,
    /// Model name
    model: String,
    /// Maximum tokens to generate
    max_tokens: Option<u32>,
    /// Request timeout, reported back on timeout errors
    timeout: Duration,
}

/// Request body for `generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A content block: one turn made of text parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// A text part.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

/// Sampling limits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

/// Response body from `generateContent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

/// One generated candidate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Why a prompt was refused.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Error response from the API.
#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Clone, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiClient {
    /// Creates a new Gemini client.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::invalid_config` if no API key can be
    /// resolved, or a network error if the HTTP client cannot be created.
    pub fn new(config: &ModelConfig) -> Result<Self, GenerationError> {
        let api_key = config.resolve_api_key();
        if api_key.is_empty() {
            return Err(GenerationError::invalid_config(
                "model.api_key_env",
                "no Gemini API key found; set GOOGLE_API_KEY",
            ));
        }

        let base_url = config.effective_base_url().ok_or_else(|| {
            GenerationError::invalid_config("model.base_url", "no base URL for Gemini")
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenerationError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }

    /// Returns the generateContent endpoint URL.
    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Converts the conversation to Gemini contents, ending with the new user turn.
    fn convert_messages(history: &[Message], user_text: &str) -> Vec<GeminiContent> {
        history
            .iter()
            .map(|msg| GeminiContent {
                role: Some(
                    match msg.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: msg.content.clone(),
                }],
            })
            .chain(std::iter::once(GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: user_text.to_string(),
                }],
            }))
            .collect()
    }

    /// Extracts the reply text from a response.
    fn extract_text(response: GenerateContentResponse) -> Result<String, GenerationError> {
        let block_reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);

        let Some(candidate) = response.candidates.into_iter().next() else {
            return Err(GenerationError::empty_response(block_reason));
        };

        let text: String = candidate
            .content
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::empty_response(candidate.finish_reason));
        }
        Ok(text)
    }

    /// Parses an error response.
    async fn parse_error_response(&self, response: reqwest::Response) -> GenerationError {
        let status = response.status();
        let status_code = status.as_u16();

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

        match serde_json::from_str::<GeminiErrorResponse>(&error_body) {
            Ok(api_error) => {
                let detail = api_error.error;
                let auth_status = matches!(
                    detail.status.as_deref(),
                    Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED")
                );
                if auth_status || detail.message.contains("API key") {
                    GenerationError::authentication_failed(detail.message)
                } else {
                    GenerationError::api_error(status_code, detail.message)
                }
            }
            Err(_) => GenerationError::api_error(
                status_code,
                if error_body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    error_body
                },
            ),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let request_body = GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system_prompt.to_string(),
                }],
            },
            contents: Self::convert_messages(history, user_text),
            generation_config: self.max_tokens.map(|max_output_tokens| GenerationConfig {
                max_output_tokens,
            }),
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::timeout(self.timeout)
                } else {
                    GenerationError::network(format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(self.parse_error_response(response).await);
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::parse_error(format!("failed to parse response: {}", e)))?;

        Self::extract_text(completion)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        let config = ModelConfig::default().with_api_key("test-key");
        GeminiClient::new(&config).unwrap()
    }

    #[test]
    fn new_requires_api_key() {
        let config = ModelConfig::default()
            .with_api_key_env("FURHAT_DIALOGUE_UNSET_GEMINI_KEY");
        // GOOGLE_API_KEY may be set on a developer machine.
        if std::env::var("GOOGLE_API_KEY").is_err() {
            let err = GeminiClient::new(&config).unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn endpoint_includes_model() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-flash-latest:generateContent"
        );
    }

    #[test]
    fn convert_messages_maps_assistant_to_model_and_appends_user_text() {
        let history = vec![Message::user("Hi, I am John."), Message::assistant("Hello John!")];

        let contents = GeminiClient::convert_messages(&history, "What was my name?");

        let roles: Vec<_> = contents.iter().filter_map(|c| c.role.as_deref()).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(contents[2].parts[0].text, "What was my name?");
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: "persona".to_string(),
                }],
            },
            contents: GeminiClient::convert_messages(&[], "hi"),
            generation_config: Some(GenerationConfig {
                max_output_tokens: 256,
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "[Smile] Hello "}, {"text": "there."}]}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();

        assert_eq!(
            GeminiClient::extract_text(response).unwrap(),
            "[Smile] Hello there."
        );
    }

    #[test]
    fn extract_text_reports_block_reason() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();

        let err = GeminiClient::extract_text(response).unwrap_err();
        assert_eq!(
            err,
            GenerationError::empty_response(Some("SAFETY".to_string()))
        );
    }

    #[test]
    fn extract_text_rejects_blank_candidate() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();

        let err = GeminiClient::extract_text(response).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
