//! # furhat-dialogue: Turn-Taking Dialogue for a Social Robot
//!
//! A conversation loop for a Furhat robot: listen for speech, ask a language
//! model for a reply, and perform the reply as speech interleaved with facial
//! gestures. When nobody talks for a while the robot idles, glancing around
//! and listening passively until someone engages again.
//!
//! ## Architecture
//!
//! - **Controller**: the `Listening → Talking → Listening` state machine,
//!   with `Idle` and `Stopped`
//! - **Tag Parser**: splits `"[Smile] Hello!"` into speech and gestures
//! - **Attention Tracker**: keeps the robot facing the active speaker
//! - **Dialogue Session**: conversation history around a [`llm::LanguageModel`]
//! - **Actuator**: the robot control surface (Furhat Remote API, console, or
//!   a recording double)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use furhat_dialogue::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = furhat_dialogue::config::load()?;
//!     let actuator = Arc::new(FurhatClient::new(&config.robot)?);
//!     let dialogue = DialogueSession::from_config(&config.model)?;
//!     let (gestures, _) = config.gesture_map();
//!
//!     let mut controller = Controller::new(config.session, gestures, actuator, dialogue)?;
//!     controller.run().await;
//!     Ok(())
//! }
//! ```

pub mod actuator;
pub mod attention;
pub mod config;
pub mod controller;
pub mod dialogue;
pub mod error;
pub mod expression;
pub mod llm;
pub mod logging;
pub mod messages;
pub mod parser;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actuator::{
        Actuator, ConsoleActuator, FurhatClient, FurhatRealtime, RecordingActuator, Utterance,
        VisibleUser,
    };
    pub use crate::attention::AttentionTracker;
    pub use crate::config::{AppConfig, RobotConfig, SessionConfig};
    pub use crate::controller::{is_goodbye, Controller, InteractionState};
    pub use crate::dialogue::DialogueSession;
    pub use crate::error::{ActuatorError, ConfigError};
    pub use crate::expression::{ExpressionTag, GestureMap};
    pub use crate::llm::{GenerationError, LanguageModel, ModelConfig, ProviderKind};
    pub use crate::messages::{Message, MessageRole};
    pub use crate::parser::{ActionSegment, TagParser};
    pub use crate::types::{GestureId, UserId};
}
