//! Language model trait abstraction.
//!
//! This module defines the [`LanguageModel`] trait which abstracts over
//! different providers (Gemini, OpenAI, Ollama) so the dialogue session can
//! work with any backend.

use crate::llm::error::GenerationError;
use crate::messages::Message;
use async_trait::async_trait;

/// Trait for language model clients.
///
/// Implementations are stateless with respect to the conversation: the full
/// history is passed on every call and owned by the dialogue session.
///
/// # Example
///
/// ```ignore
/// use furhat_dialogue::llm::{GeminiClient, LanguageModel, ModelConfig};
///
/// let client = GeminiClient::new(&ModelConfig::default())?;
/// let reply = client.generate("You are a robot.", &[], "Hello!").await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    /// Generates the assistant's reply to `user_text`.
    ///
    /// # Arguments
    ///
    /// * `system_prompt` - Persona and behaviour policy
    /// * `history` - Prior turns, oldest first, not including `user_text`
    /// * `user_text` - The latest user utterance
    ///
    /// # Errors
    ///
    /// Returns a `GenerationError` on transport, quota or parse failure.
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_text: &str,
    ) -> Result<String, GenerationError>;

    /// Returns the model identifier for logging.
    fn model_name(&self) -> &str;

    /// Returns the name of this provider for logging.
    fn provider_name(&self) -> &'static str;
}
