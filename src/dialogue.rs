//! Dialogue session with a language model.
//!
//! A [`DialogueSession`] owns the conversation history for one controller run
//! and turns each user utterance into a reply. Replies may contain inline
//! expression markers such as `[Smile]`; the session passes them through
//! untouched.

use crate::llm::{build_model, GenerationError, LanguageModel, ModelConfig};
use crate::messages::Message;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Persona used when the model configuration carries no system prompt.
pub const DEFAULT_PERSONA: &str = "\
IDENTITY & ROLE
You are Furhat, a physical social robot at the reception desk. You are not a \
disembodied AI; you are present in the room with the visitor.

PERSONALITY & TONE
1. Warm and professional: always polite, welcoming and helpful.
2. Empathetic: if the visitor sounds frustrated, confused or sad, acknowledge \
it before solving the problem.
3. Witty: light, appropriate humor is fine; never clownish.
4. Concise: you speak through text-to-speech. Keep answers under two or three \
sentences, in natural spoken phrasing, with no lists or markdown.

GESTURES
Put these tags at the start or end of a sentence; they become facial expressions:
- [SMILE] greetings, jokes, positive confirmations
- [NOD] agreeing or confirming understanding
- [CONCERN] the visitor is frustrated or reports a problem
- [WINK] joking or being playful
- [NEUTRAL] plain information
Never use any other bracketed words.

CONSTRAINTS
You can answer general questions, give directions and chat. You cannot leave \
the desk or carry luggage. If you do not know an answer, say so and offer to \
call a member of staff; never invent facts about the building. End with a \
short prompt when the conversation should continue, such as \
\"Can I help you with anything else?\"

EXAMPLES
Visitor: \"Where are the restrooms?\"
You: [NOD] The restrooms are just down the hall to your right.
Visitor: \"I've been waiting for 20 minutes and nobody has come to get me!\"
You: [CONCERN] I am very sorry to hear that. Let me ping the host for you right away.
Visitor: \"Are you sentient?\"
You: [WINK] That is a philosophical question for a Tuesday morning! I like to \
think I'm charming, at least.";

/// Canned transcript returned for every input in mocked mode.
///
/// Two exchanges, so an offline run still exercises multi-sentence replies,
/// upper-case markers and bracketed text that is not a marker.
pub const MOCK_REPLY: &str = "\
--- User: Hi, I am John. ---
Furhat: [SMILE] Hello John, welcome! [NOD] The restrooms are [just down the \
hall to your right]. Did you need help finding anything else?

--- User: What was my name? ---
Furhat: [SMILE] Your name is John. My memory systems are working perfectly \
today! [NOD] What else can I help you with?";

/// Where replies come from.
#[derive(Debug, Clone)]
enum Backend {
    /// A real model endpoint
    Live(Arc<dyn LanguageModel>),
    /// Canned reply, no network
    Mock,
}

/// State created on the first turn of a conversation.
#[derive(Debug, Clone)]
struct ChatSession {
    /// Persona and behaviour policy
    system_prompt: String,
    /// Model identifier, for diagnostics
    model_name: String,
    /// Prior turns, oldest first
    history: Vec<Message>,
}

/// A conversation with a language model.
#[derive(Debug, Clone)]
pub struct DialogueSession {
    backend: Backend,
    system_prompt: String,
    session: Option<ChatSession>,
}

impl DialogueSession {
    /// Creates a session backed by a live model.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>, system_prompt: impl Into<String>) -> Self {
        Self {
            backend: Backend::Live(model),
            system_prompt: system_prompt.into(),
            session: None,
        }
    }

    /// Creates a session that answers every input with [`MOCK_REPLY`].
    #[must_use]
    pub fn mocked() -> Self {
        Self {
            backend: Backend::Mock,
            system_prompt: DEFAULT_PERSONA.to_string(),
            session: None,
        }
    }

    /// Creates a session from model configuration.
    ///
    /// The `mock` provider yields a mocked session.
    ///
    /// # Errors
    ///
    /// Returns the error from [`build_model`] if the client cannot be created.
    pub fn from_config(config: &ModelConfig) -> Result<Self, GenerationError> {
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string());

        Ok(match build_model(config)? {
            Some(model) => Self::new(model, system_prompt),
            None => Self {
                system_prompt,
                ..Self::mocked()
            },
        })
    }

    /// Returns the reply to `user_text`.
    ///
    /// On success the user and assistant turns are appended to the history.
    /// On failure the history is left as it was. Mocked sessions never touch
    /// the history.
    ///
    /// # Errors
    ///
    /// Returns the model's `GenerationError` unchanged; no retry is attempted.
    pub async fn respond(&mut self, user_text: &str) -> Result<String, GenerationError> {
        let model = match &self.backend {
            Backend::Mock => {
                debug!("mocked session, returning canned reply");
                return Ok(MOCK_REPLY.to_string());
            }
            Backend::Live(model) => Arc::clone(model),
        };

        let system_prompt = &self.system_prompt;
        let session = self.session.get_or_insert_with(|| {
            info!(model = model.model_name(), "starting chat session");
            ChatSession {
                system_prompt: system_prompt.clone(),
                model_name: model.model_name().to_string(),
                history: Vec::new(),
            }
        });

        let reply = model
            .generate(&session.system_prompt, &session.history, user_text)
            .await?;

        session.history.push(Message::user(user_text));
        session.history.push(Message::assistant(reply.clone()));
        debug!(turns = session.history.len(), "reply received");

        Ok(reply)
    }

    /// Drops the conversation so the next turn starts fresh.
    pub fn reset_history(&mut self) {
        if self.session.take().is_some() {
            info!("conversation history cleared");
        }
    }

    /// Returns the number of recorded turns.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.history.len())
    }

    /// Returns the recorded turns, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        self.session
            .as_ref()
            .map(|s| s.history.as_slice())
            .unwrap_or_default()
    }

    /// Returns true if replies are canned.
    #[must_use]
    pub fn is_mocked(&self) -> bool {
        matches!(self.backend, Backend::Mock)
    }

    /// Returns the model identifier, or "mock".
    #[must_use]
    pub fn model_name(&self) -> &str {
        match &self.backend {
            Backend::Live(model) => model.model_name(),
            Backend::Mock => "mock",
        }
    }
}

impl fmt::Display for DialogueSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model_name = self
            .session
            .as_ref()
            .map_or_else(|| self.model_name(), |s| s.model_name.as_str());
        writeln!(f, "model: {}", model_name)?;
        writeln!(f, "turns: {}", self.history_len())?;
        write!(f, "system prompt: {}", self.system_prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionTag;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes the input and remembers how much history it was given.
    #[derive(Debug, Default)]
    struct EchoModel {
        seen_history: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(
            &self,
            _system_prompt: &str,
            history: &[Message],
            user_text: &str,
        ) -> Result<String, GenerationError> {
            self.seen_history.lock().unwrap().push(history.len());
            if self.fail {
                return Err(GenerationError::network("connection reset"));
            }
            Ok(format!("[Nod] you said {}", user_text))
        }

        fn model_name(&self) -> &str {
            "echo"
        }

        fn provider_name(&self) -> &'static str {
            "test"
        }
    }

    #[tokio::test]
    async fn live_history_grows_by_two_per_turn() {
        let model = Arc::new(EchoModel::default());
        let mut session = DialogueSession::new(model.clone(), "persona");

        let reply = session.respond("hello").await.unwrap();
        session.respond("again").await.unwrap();

        assert_eq!(reply, "[Nod] you said hello");
        assert_eq!(session.history_len(), 4);
        assert_eq!(*model.seen_history.lock().unwrap(), vec![0, 2]);
        assert_eq!(session.history()[0], Message::user("hello"));
    }

    #[tokio::test]
    async fn reset_history_clears_turns() {
        let mut session = DialogueSession::new(Arc::new(EchoModel::default()), "persona");
        session.respond("hello").await.unwrap();
        session.respond("again").await.unwrap();

        session.reset_history();

        assert_eq!(session.history_len(), 0);
    }

    #[tokio::test]
    async fn mocked_reply_is_deterministic() {
        let mut session = DialogueSession::mocked();

        let first = session.respond("what time is it?").await.unwrap();
        let second = session.respond("").await.unwrap();

        assert_eq!(first, MOCK_REPLY);
        assert_eq!(first, second);
        assert_eq!(session.history_len(), 0);
        assert!(session.is_mocked());
    }

    #[test]
    fn mock_reply_is_a_two_turn_transcript() {
        assert_eq!(MOCK_REPLY.matches("--- User:").count(), 2);
        assert_eq!(MOCK_REPLY.matches("Furhat:").count(), 2);
        assert!(MOCK_REPLY.contains("[SMILE]"));
        assert!(MOCK_REPLY.contains("[NOD]"));
    }

    #[test]
    fn default_persona_names_every_marker() {
        for tag in ExpressionTag::ALL {
            let marker = tag.marker().to_uppercase();
            assert!(DEFAULT_PERSONA.contains(&marker), "missing {}", marker);
        }
    }

    #[tokio::test]
    async fn failure_propagates_and_keeps_history() {
        let model = Arc::new(EchoModel {
            fail: true,
            ..EchoModel::default()
        });
        let mut session = DialogueSession::new(model, "persona");

        let err = session.respond("hello").await.unwrap_err();

        assert!(err.is_retriable());
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn from_config_mock_provider() {
        let config = ModelConfig::mock().with_system_prompt("custom");

        let session = DialogueSession::from_config(&config).unwrap();

        assert!(session.is_mocked());
        assert!(session.to_string().contains("custom"));
    }

    #[test]
    fn display_shows_model_and_turns() {
        let session = DialogueSession::new(Arc::new(EchoModel::default()), "be brief");

        let text = session.to_string();

        assert!(text.contains("model: echo"));
        assert!(text.contains("turns: 0"));
        assert!(text.contains("be brief"));
    }
}
