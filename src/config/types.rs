//! Configuration types.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration for a robot on `localhost`.

use crate::controller::is_goodbye;
use crate::error::ConfigError;
use crate::expression::{default_gesture_table, GestureMap};
use crate::llm::ModelConfig;
use crate::logging::LoggingConfig;
use crate::types::GestureId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration structure.
///
/// This structure maps directly to the TOML configuration file format:
///
/// ```toml
/// [robot]
/// host = "192.168.1.20"
/// voice_name = "Matthew"
///
/// [session]
/// idle_timeout_secs = 60
/// goodbye_triggers = ["goodbye", "bye", "see you"]
///
/// [model]
/// provider = "gemini"
/// model = "gemini-flash-latest"
///
/// [gestures]
/// smile = "BigSmile"
/// concern = "ExpressSad"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Robot address and persona.
    pub robot: RobotConfig,
    /// Turn-taking behaviour.
    pub session: SessionConfig,
    /// Language model backend.
    pub model: ModelConfig,
    /// Console and file logging.
    pub logging: LoggingConfig,
    /// Expression tag name to gesture name. Replaces the defaults when present.
    pub gestures: BTreeMap<String, String>,
}

impl AppConfig {
    /// Builds the gesture map, returning any unusable entries alongside it.
    #[must_use]
    pub fn gesture_map(&self) -> (GestureMap, Vec<ConfigError>) {
        GestureMap::from_table(&self.gestures)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            robot: RobotConfig::default(),
            session: SessionConfig::default(),
            model: ModelConfig::default(),
            logging: LoggingConfig::default(),
            gestures: default_gesture_table(),
        }
    }
}

/// How to reach the robot and how it should look and sound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Robot host name or IP address.
    pub host: String,
    /// Remote API port.
    pub port: u16,
    /// Text-to-speech voice.
    pub voice_name: String,
    /// Face texture.
    pub character_name: String,
    /// Face mask model.
    pub mask_type: String,
    /// Speech recognition language.
    pub input_language: String,
    /// Timeout for ordinary API requests, in seconds.
    pub request_timeout_secs: u64,
    /// Realtime API port. When set, listening goes through the event socket
    /// so the robot applies the controller's no-speech timeout itself.
    pub realtime_port: Option<u16>,
}

impl RobotConfig {
    /// Sets the robot host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the Remote API port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the Remote API base URL, e.g. `http://localhost:54321/furhat`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/furhat", self.host, self.port)
    }

    /// Enables listening through the Realtime API on `port`.
    #[must_use]
    pub fn with_realtime_port(mut self, port: u16) -> Self {
        self.realtime_port = Some(port);
        self
    }

    /// Returns the Realtime API event socket URL, if one is configured.
    #[must_use]
    pub fn realtime_url(&self) -> Option<String> {
        self.realtime_port
            .map(|port| format!("ws://{}:{}/v1/events", self.host, port))
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 54321,
            voice_name: "Matthew".to_string(),
            character_name: "James".to_string(),
            mask_type: "Adult".to_string(),
            input_language: "en-US".to_string(),
            request_timeout_secs: 10,
            realtime_port: None,
        }
    }
}

/// Turn-taking behaviour of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds without a successful utterance before going idle.
    pub idle_timeout_secs: u64,
    /// Seconds between idle gestures; 0 disables them.
    pub idle_animation_interval_secs: u64,
    /// Gestures picked at random while idle.
    pub idle_gestures: Vec<GestureId>,
    /// Phrases that end the conversation (case-insensitive substrings).
    pub goodbye_triggers: Vec<String>,
    /// Spoken when the controller starts. May contain expression markers.
    pub greeting: String,
    /// Spoken when the controller stops. May contain expression markers.
    pub farewell: String,
    /// Spoken when no reply could be generated. May contain expression markers.
    pub apology: String,
    /// Pause after attending and before listening, in milliseconds.
    pub settle_delay_ms: u64,
    /// Pause before the passive idle listen, in milliseconds.
    pub idle_settle_delay_ms: u64,
    /// Pause after the greeting, in milliseconds.
    pub post_greeting_delay_ms: u64,
    /// Pause between controller cycles, in milliseconds.
    pub poll_interval_ms: u64,
    /// Pause after a failed listen, in milliseconds.
    pub error_backoff_ms: u64,
    /// No-speech timeout while listening; unset uses the robot's default.
    pub listen_timeout_secs: Option<u64>,
    /// No-speech timeout for the passive idle listen.
    pub idle_listen_timeout_secs: u64,
}

impl SessionConfig {
    /// Returns the idle timeout as a Duration.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Returns the interval between idle gestures, or `None` if disabled.
    #[must_use]
    pub fn idle_animation_interval(&self) -> Option<Duration> {
        (self.idle_animation_interval_secs > 0)
            .then(|| Duration::from_secs(self.idle_animation_interval_secs))
    }

    /// Returns the settle delay as a Duration.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Returns the idle settle delay as a Duration.
    #[must_use]
    pub fn idle_settle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_settle_delay_ms)
    }

    /// Returns the post-greeting delay as a Duration.
    #[must_use]
    pub fn post_greeting_delay(&self) -> Duration {
        Duration::from_millis(self.post_greeting_delay_ms)
    }

    /// Returns the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the error back-off as a Duration.
    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    /// Returns the active listen timeout.
    #[must_use]
    pub fn listen_timeout(&self) -> Option<Duration> {
        self.listen_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the idle listen timeout.
    #[must_use]
    pub fn idle_listen_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_listen_timeout_secs)
    }

    /// Sets the idle timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_secs = timeout.as_secs();
        self
    }

    /// Returns true if `text` contains one of the goodbye triggers.
    #[must_use]
    pub fn is_goodbye(&self, text: &str) -> bool {
        is_goodbye(text, &self.goodbye_triggers)
    }

    /// Checks for values the controller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "session.idle_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.listen_timeout_secs == Some(0) {
            return Err(ConfigError::invalid_value(
                "session.listen_timeout_secs",
                "must be greater than zero when set",
            ));
        }
        if self.idle_listen_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "session.idle_listen_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.goodbye_triggers.iter().all(|t| t.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "session.goodbye_triggers",
                "at least one non-empty trigger is needed to end a conversation",
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let idle_gestures = ["LookAround", "Oh", "Wink", "Smile"]
            .into_iter()
            .filter_map(|name| GestureId::parse(name).ok())
            .collect();

        Self {
            idle_timeout_secs: 60,
            idle_animation_interval_secs: 10,
            idle_gestures,
            goodbye_triggers: ["goodbye", "bye", "see you", "shut up", "exit"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            greeting: "Hello! [Smile] I am ready to chat. Please step closer.".to_string(),
            farewell: "Alright. Goodbye for now! [Smile]".to_string(),
            apology: "[Concern] Sorry, I lost my train of thought. Could you say that again?"
                .to_string(),
            settle_delay_ms: 400,
            idle_settle_delay_ms: 200,
            post_greeting_delay_ms: 500,
            poll_interval_ms: 50,
            error_backoff_ms: 1000,
            listen_timeout_secs: None,
            idle_listen_timeout_secs: 5,
        }
    }
}
