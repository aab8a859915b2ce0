//! The robot control surface consumed by the dialogue core.
//!
//! The [`Actuator`] trait abstracts over speech synthesis, gesture execution,
//! gaze and the microphone so that the controller can drive a real Furhat
//! robot, a console simulation, or a scripted test double.

mod console;
pub mod events;
mod furhat;
mod realtime;
mod recording;

pub use console::ConsoleActuator;
pub use furhat::FurhatClient;
pub use realtime::FurhatRealtime;
pub use recording::{ActuatorCall, RecordingActuator};

use crate::error::ActuatorError;
use crate::types::{GestureId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A person currently visible to the robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleUser {
    /// Identifier used to attend to this user
    pub id: UserId,
    /// Whether the robot believes this user is talking, when it can tell
    #[serde(default)]
    pub is_speaking: Option<bool>,
}

impl VisibleUser {
    /// Creates a user with unknown speaking status.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            is_speaking: None,
        }
    }

    /// Marks whether the user is currently speaking.
    #[must_use]
    pub fn speaking(mut self, is_speaking: bool) -> Self {
        self.is_speaking = Some(is_speaking);
        self
    }
}

/// Something the user said, as recognized by the robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Recognized text
    pub text: String,
    /// When recognition finished
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    /// Creates an utterance stamped with the current time.
    ///
    /// Returns `None` if the text is empty or only whitespace, so callers
    /// never have to handle a blank utterance.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
            timestamp: Utc::now(),
        })
    }
}

/// Control surface of the physical robot.
///
/// Every method is awaited to completion before the controller moves on; the
/// robot has a single speech channel and a single microphone, so calls are
/// never overlapped.
#[async_trait]
pub trait Actuator: Send + Sync + std::fmt::Debug {
    /// Speaks the given text.
    ///
    /// With `blocking` set, returns only once the robot has finished speaking.
    async fn speak(&self, text: &str, blocking: bool) -> Result<(), ActuatorError>;

    /// Starts a gesture. Returns as soon as the robot accepted it.
    async fn gesture(&self, gesture: &GestureId) -> Result<(), ActuatorError>;

    /// Turns the robot's gaze (and directional microphone) toward a user.
    async fn attend(&self, user: &UserId) -> Result<(), ActuatorError>;

    /// Lists users currently visible to the robot.
    ///
    /// Precondition relied on by the attention tracker: the list is ordered
    /// by proximity, closest first.
    async fn list_users(&self) -> Result<Vec<VisibleUser>, ActuatorError>;

    /// Listens for one utterance.
    ///
    /// Returns `Ok(None)` when nobody spoke before the no-speech timeout. The
    /// timeout is enforced by the actuator; `None` means its own default.
    async fn listen(&self, timeout: Option<Duration>) -> Result<Option<Utterance>, ActuatorError>;

    /// Returns the name of this actuator for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utterance_rejects_blank_text() {
        assert!(Utterance::new("").is_none());
        assert!(Utterance::new("  \n ").is_none());
    }

    #[test]
    fn utterance_trims_text() {
        let utterance = Utterance::new("  hello robot ").unwrap();
        assert_eq!(utterance.text, "hello robot");
    }

    #[test]
    fn visible_user_deserializes_without_speaking_flag() {
        let user: VisibleUser = serde_json::from_str(r#"{"id": "user-1"}"#).unwrap();
        assert_eq!(user.id.as_str(), "user-1");
        assert_eq!(user.is_speaking, None);
    }

    #[test]
    fn visible_user_builder() {
        let user = VisibleUser::new(UserId::parse("u2").unwrap()).speaking(true);
        assert_eq!(user.is_speaking, Some(true));
    }
}
