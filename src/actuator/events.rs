//! Event-driven listening.
//!
//! Some robot APIs push speech notifications instead of answering a single
//! blocking `listen` call. This module folds such a push stream back into the
//! request/response contract the controller expects, while enforcing the
//! ordering the robot promises for one listen attempt:
//!
//! 1. `SpeechStarted`
//! 2. zero or more `Partial` transcripts
//! 3. exactly one terminal event, `Heard` or `NoSpeech`
//!
//! `NoSpeech` may also arrive without a preceding `SpeechStarted`. Because
//! [`collect_utterance`] only returns after the terminal event, a caller that
//! awaits it can never start a second listen attempt early.

use super::Utterance;
use crate::error::ActuatorError;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;

/// A notification pushed by the robot during one listen attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenEvent {
    /// The user started speaking
    SpeechStarted,
    /// Intermediate transcript while the user is still speaking
    Partial {
        /// Transcript so far
        text: String,
    },
    /// Final transcript; ends the attempt
    Heard {
        /// Recognized text
        text: String,
    },
    /// Nobody spoke before the timeout; ends the attempt
    NoSpeech,
}

impl ListenEvent {
    /// Returns true for events that end a listen attempt.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Heard { .. } | Self::NoSpeech)
    }
}

/// Type alias for a boxed stream of listen events.
pub type ListenEventStream =
    Pin<Box<dyn Stream<Item = Result<ListenEvent, ActuatorError>> + Send>>;

/// A robot microphone that reports speech as a stream of events.
#[async_trait]
pub trait ListenEventSource: Send + Sync {
    /// Starts one listen attempt and returns its event stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot be started.
    async fn start_listening(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ListenEventStream, ActuatorError>;
}

/// Progress through one listen attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingSpeech,
    Hearing,
}

/// Drains one listen attempt and returns its result.
///
/// # Errors
///
/// Returns a protocol error if events arrive out of order, a connection error
/// if the stream ends before a terminal event, and passes through errors
/// yielded by the stream itself.
pub async fn collect_utterance(
    mut events: ListenEventStream,
) -> Result<Option<Utterance>, ActuatorError> {
    let mut phase = Phase::AwaitingSpeech;
    let mut last_partial: Option<String> = None;

    while let Some(event) = events.next().await {
        let event = event?;
        tracing::trace!(?event, ?phase, "listen event");

        match (phase, event) {
            (Phase::AwaitingSpeech, ListenEvent::SpeechStarted) => {
                phase = Phase::Hearing;
            }
            (Phase::Hearing, ListenEvent::Partial { text }) => {
                last_partial = Some(text);
            }
            (Phase::Hearing, ListenEvent::Heard { text }) => {
                return Ok(Utterance::new(text));
            }
            (_, ListenEvent::NoSpeech) => {
                if let Some(partial) = last_partial {
                    tracing::debug!(partial = %partial, "listen ended without a final transcript");
                }
                return Ok(None);
            }
            (Phase::Hearing, ListenEvent::SpeechStarted) => {
                return Err(ActuatorError::protocol(
                    "listen",
                    "speech started twice in one listen attempt",
                ));
            }
            (Phase::AwaitingSpeech, event) => {
                return Err(ActuatorError::protocol(
                    "listen",
                    format!("received {:?} before speech started", event),
                ));
            }
        }
    }

    Err(ActuatorError::connection(
        "listen",
        "event stream closed before a final transcript",
    ))
}
