//! Console actuator for running the dialogue loop without a robot.
//!
//! Speech and gestures are printed to stdout; each line typed on stdin is one
//! utterance. Listening goes through the event-driven adapter so the console
//! behaves like a robot that pushes speech notifications.

use super::events::{collect_utterance, ListenEvent, ListenEventSource, ListenEventStream};
use super::{Actuator, Utterance, VisibleUser};
use crate::error::ActuatorError;
use crate::types::{GestureId, UserId};
use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Actuator backed by the terminal.
#[derive(Debug)]
pub struct ConsoleActuator {
    /// Shared stdin reader; only one listen attempt holds it at a time
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
    /// Utterance reported when stdin is closed
    eof_phrase: String,
}

impl ConsoleActuator {
    /// Creates a console actuator reading from stdin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
            eof_phrase: "goodbye".to_string(),
        }
    }

    /// Sets what closing stdin counts as having said.
    ///
    /// Use one of the goodbye triggers so that piping a script into the
    /// binary ends the conversation at end of input.
    #[must_use]
    pub fn with_eof_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.eof_phrase = phrase.into();
        self
    }
}

impl Default for ConsoleActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListenEventSource for ConsoleActuator {
    async fn start_listening(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ListenEventStream, ActuatorError> {
        let lines = Arc::clone(&self.lines);
        let eof_phrase = self.eof_phrase.clone();

        print!("{} ", "you>".green().bold());
        std::io::stdout()
            .flush()
            .map_err(|e| ActuatorError::connection("listen", e.to_string()))?;

        Ok(Box::pin(async_stream::stream! {
            let mut lines = lines.lock().await;
            let read = match timeout {
                Some(limit) => tokio::time::timeout(limit, lines.next_line()).await.ok(),
                None => Some(lines.next_line().await),
            };

            match read {
                None => {
                    println!();
                    yield Ok(ListenEvent::NoSpeech);
                }
                Some(Ok(Some(line))) if line.trim().is_empty() => {
                    yield Ok(ListenEvent::NoSpeech);
                }
                Some(Ok(Some(line))) => {
                    yield Ok(ListenEvent::SpeechStarted);
                    yield Ok(ListenEvent::Heard { text: line });
                }
                Some(Ok(None)) => {
                    println!();
                    yield Ok(ListenEvent::SpeechStarted);
                    yield Ok(ListenEvent::Heard { text: eof_phrase });
                }
                Some(Err(e)) => {
                    yield Err(ActuatorError::connection("listen", e.to_string()));
                }
            }
        }))
    }
}

#[async_trait]
impl Actuator for ConsoleActuator {
    async fn speak(&self, text: &str, _blocking: bool) -> Result<(), ActuatorError> {
        println!("{} {}", "furhat>".cyan().bold(), text);
        Ok(())
    }

    async fn gesture(&self, gesture: &GestureId) -> Result<(), ActuatorError> {
        println!("{}", format!("        *{}*", gesture).yellow());
        Ok(())
    }

    async fn attend(&self, user: &UserId) -> Result<(), ActuatorError> {
        tracing::trace!(user = %user, "console attend");
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<VisibleUser>, ActuatorError> {
        let id = UserId::parse("console")
            .map_err(|e| ActuatorError::invalid_response("list_users", e.to_string()))?;
        Ok(vec![VisibleUser::new(id).speaking(true)])
    }

    async fn listen(&self, timeout: Option<Duration>) -> Result<Option<Utterance>, ActuatorError> {
        let events = self.start_listening(timeout).await?;
        collect_utterance(events).await
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
