//! The turn-taking state machine.
//!
//! The [`Controller`] alternates between listening, talking and idling until
//! the user says goodbye:
//!
//! ```text
//!            utterance              reply performed
//! Listening ───────────► Talking ──────────────────► Listening
//!     │                     ▲
//!     │ silence > timeout   │ utterance
//!     ▼                     │
//!   Idle ───────────────────┘
//!
//! Listening / Idle ── goodbye ──► Stopped (farewell, history cleared)
//! ```
//!
//! All work happens on one task: every actuator and model call is awaited
//! before the next cycle starts.

use crate::actuator::{Actuator, Utterance};
use crate::attention::AttentionTracker;
use crate::config::SessionConfig;
use crate::dialogue::DialogueSession;
use crate::error::ConfigError;
use crate::expression::GestureMap;
use crate::parser::TagParser;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// The controller's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionState {
    /// Facing a user and waiting for speech
    Listening,
    /// Generating and performing a reply
    Talking,
    /// Nobody has spoken for a while; animating and listening passively
    Idle,
    /// The conversation is over
    Stopped,
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening => write!(f, "listening"),
            Self::Talking => write!(f, "talking"),
            Self::Idle => write!(f, "idle"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Returns true if `text` contains any non-empty trigger, ignoring case.
#[must_use]
pub fn is_goodbye<S: AsRef<str>>(text: &str, triggers: &[S]) -> bool {
    let text = text.to_lowercase();
    triggers
        .iter()
        .map(|trigger| trigger.as_ref().trim())
        .filter(|trigger| !trigger.is_empty())
        .any(|trigger| text.contains(&trigger.to_lowercase()))
}

/// Drives one conversation from greeting to farewell.
#[derive(Debug)]
pub struct Controller {
    config: SessionConfig,
    actuator: Arc<dyn Actuator>,
    parser: TagParser,
    attention: AttentionTracker,
    dialogue: DialogueSession,
    state: InteractionState,
    /// Utterance waiting to be answered in `Talking`
    pending: Option<Utterance>,
    /// End of the last successful exchange; drives the idle timeout
    last_activity: Instant,
    /// When the last idle gesture started
    last_idle_gesture: Option<Instant>,
}

impl Controller {
    /// Creates a controller in the `Listening` state.
    ///
    /// Gesture table problems are logged; tags without a gesture are skipped
    /// when performed.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the session configuration is invalid.
    pub fn new(
        config: SessionConfig,
        gestures: GestureMap,
        actuator: Arc<dyn Actuator>,
        dialogue: DialogueSession,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        for problem in gestures.validate() {
            warn!(error = %problem, "gesture table");
        }
        if config.idle_animation_interval().is_some() && config.idle_gestures.is_empty() {
            warn!("idle animation is enabled but no idle gestures are configured");
        }

        let parser = TagParser::new(gestures, Arc::clone(&actuator))?;
        let attention = AttentionTracker::new(Arc::clone(&actuator));

        Ok(Self {
            config,
            actuator,
            parser,
            attention,
            dialogue,
            state: InteractionState::Listening,
            pending: None,
            last_activity: Instant::now(),
            last_idle_gesture: None,
        })
    }

    /// Greets, then runs until the conversation is stopped.
    pub async fn run(&mut self) {
        info!(
            actuator = self.actuator.name(),
            model = self.dialogue.model_name(),
            "starting conversation"
        );
        self.parser.perform(&self.config.greeting).await;
        sleep(self.config.post_greeting_delay()).await;
        self.last_activity = Instant::now();

        while self.step().await != InteractionState::Stopped {
            sleep(self.config.poll_interval()).await;
        }
        info!("conversation finished");
    }

    /// Runs the handler for the current state once and returns the new state.
    ///
    /// Entering `Stopped` performs the farewell and clears the history before
    /// returning. Stepping a stopped controller does nothing.
    pub async fn step(&mut self) -> InteractionState {
        let next = match self.state {
            InteractionState::Listening => self.handle_listening().await,
            InteractionState::Talking => self.handle_talking().await,
            InteractionState::Idle => self.handle_idle().await,
            InteractionState::Stopped => return InteractionState::Stopped,
        };

        if next != self.state {
            info!(from = %self.state, to = %next, "state transition");
            self.enter(next).await;
        }
        self.state = next;
        next
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Returns the dialogue session.
    #[must_use]
    pub fn dialogue(&self) -> &DialogueSession {
        &self.dialogue
    }

    /// Returns the session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn enter(&mut self, state: InteractionState) {
        match state {
            InteractionState::Idle => self.last_idle_gesture = None,
            InteractionState::Stopped => {
                self.parser.perform(&self.config.farewell).await;
                self.dialogue.reset_history();
                self.pending = None;
            }
            InteractionState::Listening | InteractionState::Talking => {}
        }
    }

    async fn handle_listening(&mut self) -> InteractionState {
        self.attention.refresh().await;
        sleep(self.config.settle_delay()).await;

        match self.actuator.listen(self.config.listen_timeout()).await {
            Ok(Some(utterance)) => self.route(utterance),
            Ok(None) => {
                let silent_for = self.last_activity.elapsed();
                if silent_for >= self.config.idle_timeout() {
                    info!(silent_secs = silent_for.as_secs(), "nobody talking; going idle");
                    InteractionState::Idle
                } else {
                    debug!("no speech");
                    InteractionState::Listening
                }
            }
            Err(e) => {
                warn!(error = %e, "listen failed");
                sleep(self.config.error_backoff()).await;
                InteractionState::Listening
            }
        }
    }

    async fn handle_talking(&mut self) -> InteractionState {
        let Some(utterance) = self.pending.take() else {
            warn!("nothing to answer");
            return InteractionState::Listening;
        };

        match self.dialogue.respond(&utterance.text).await {
            Ok(reply) => {
                debug!(reply = %reply, "model replied");
                self.parser.perform(&reply).await;
            }
            Err(e) => {
                warn!(error = %e, retriable = e.is_retriable(), "no reply; apologizing");
                self.parser.perform(&self.config.apology).await;
            }
        }

        self.last_activity = Instant::now();
        InteractionState::Listening
    }

    async fn handle_idle(&mut self) -> InteractionState {
        self.idle_animation().await;
        self.attention.refresh().await;
        sleep(self.config.idle_settle_delay()).await;

        match self
            .actuator
            .listen(Some(self.config.idle_listen_timeout()))
            .await
        {
            Ok(Some(utterance)) => {
                info!("user engaged");
                self.route(utterance)
            }
            Ok(None) => InteractionState::Idle,
            Err(e) => {
                warn!(error = %e, "idle listen failed");
                sleep(self.config.error_backoff()).await;
                InteractionState::Idle
            }
        }
    }

    /// Decides between ending the conversation and answering.
    fn route(&mut self, utterance: Utterance) -> InteractionState {
        info!(text = %utterance.text, "heard");
        if self.config.is_goodbye(&utterance.text) {
            info!("goodbye detected");
            return InteractionState::Stopped;
        }
        self.last_activity = Instant::now();
        self.pending = Some(utterance);
        InteractionState::Talking
    }

    /// Plays a random idle gesture when one is due.
    async fn idle_animation(&mut self) {
        let Some(interval) = self.config.idle_animation_interval() else {
            return;
        };
        if self
            .last_idle_gesture
            .is_some_and(|last| last.elapsed() < interval)
        {
            return;
        }

        let gesture = self
            .config
            .idle_gestures
            .choose(&mut rand::thread_rng())
            .cloned();
        self.last_idle_gesture = Some(Instant::now());

        if let Some(gesture) = gesture {
            debug!(%gesture, "idle gesture");
            if let Err(e) = self.actuator.gesture(&gesture).await {
                warn!(error = %e, "idle gesture failed");
            }
        }
    }
}
