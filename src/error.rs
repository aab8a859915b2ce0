//! Custom error types for the dialogue controller.
//!
//! Each error type implements Display, Debug, Clone, PartialEq, Eq, and std::error::Error.
//! Language-model failures live in [`crate::llm::GenerationError`].
//!
//! No external error crates (anyhow, thiserror, eyre) are used in the library.

use crate::expression::ExpressionTag;
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Actuator Errors
// =============================================================================

/// Errors raised by the robot actuator (speech, gestures, gaze, microphone).
///
/// These are transient by nature: the controller logs them and retries on the
/// next cycle instead of escalating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorError {
    /// The operation that failed (e.g. "speak", "listen")
    pub operation: String,
    /// The specific error that occurred
    pub kind: ActuatorErrorKind,
}

/// Specific actuator error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorErrorKind {
    /// The robot could not be reached
    Connection {
        /// Description of the connection failure
        message: String,
    },
    /// The robot answered with a non-success status
    RequestFailed {
        /// HTTP status code returned by the robot
        status: u16,
        /// Response body or reason phrase
        message: String,
    },
    /// The robot's response could not be understood
    InvalidResponse {
        /// Description of what was wrong with the response
        message: String,
    },
    /// An event-driven listen broke its ordering contract
    Protocol {
        /// Description of the violation
        message: String,
    },
}

impl ActuatorError {
    /// Creates a new ActuatorError for the given operation.
    #[must_use]
    pub fn new(operation: impl Into<String>, kind: ActuatorErrorKind) -> Self {
        Self {
            operation: operation.into(),
            kind,
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            operation,
            ActuatorErrorKind::Connection {
                message: message.into(),
            },
        )
    }

    /// Creates a request failed error.
    #[must_use]
    pub fn request_failed(
        operation: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            operation,
            ActuatorErrorKind::RequestFailed {
                status,
                message: message.into(),
            },
        )
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            operation,
            ActuatorErrorKind::InvalidResponse {
                message: message.into(),
            },
        )
    }

    /// Creates a protocol violation error.
    #[must_use]
    pub fn protocol(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            operation,
            ActuatorErrorKind::Protocol {
                message: message.into(),
            },
        )
    }

    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ActuatorErrorKind::Connection { .. }
                | ActuatorErrorKind::RequestFailed {
                    status: 500..=599,
                    ..
                }
        )
    }
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actuator '{}': ", self.operation)?;
        match &self.kind {
            ActuatorErrorKind::Connection { message } => {
                write!(
                    f,
                    "connection failed: {}; check that the robot is reachable",
                    message
                )
            }
            ActuatorErrorKind::RequestFailed { status, message } => {
                write!(f, "request failed with status {}: {}", status, message)
            }
            ActuatorErrorKind::InvalidResponse { message } => {
                write!(f, "invalid response: {}", message)
            }
            ActuatorErrorKind::Protocol { message } => {
                write!(f, "listen protocol violation: {}", message)
            }
        }
    }
}

impl std::error::Error for ActuatorError {}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors caused by missing or inconsistent configuration.
///
/// Outside of startup these never abort anything: the affected operation is
/// logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The specific error that occurred
    pub kind: ConfigErrorKind,
}

/// Specific configuration error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// An expression tag has no gesture in the gesture table
    UnmappedGesture {
        /// The tag without a mapping
        tag: ExpressionTag,
    },
    /// Several expression tags share one gesture
    DuplicateGesture {
        /// The gesture used more than once
        gesture: String,
    },
    /// The gesture table names a tag that does not exist
    UnknownTag {
        /// The unrecognized tag name
        name: String,
    },
    /// A configuration value is out of range or malformed
    InvalidValue {
        /// The configuration field
        field: String,
        /// Why it was invalid
        reason: String,
    },
    /// The configuration file could not be read or parsed
    FileError {
        /// Path of the file, if one was involved
        path: Option<PathBuf>,
        /// Why loading failed
        reason: String,
    },
}

impl ConfigError {
    /// Creates a new ConfigError with the given kind.
    #[must_use]
    pub fn new(kind: ConfigErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an unmapped gesture error.
    #[must_use]
    pub fn unmapped_gesture(tag: ExpressionTag) -> Self {
        Self::new(ConfigErrorKind::UnmappedGesture { tag })
    }

    /// Creates a duplicate gesture error.
    #[must_use]
    pub fn duplicate_gesture(gesture: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::DuplicateGesture {
            gesture: gesture.into(),
        })
    }

    /// Creates an unknown tag error.
    #[must_use]
    pub fn unknown_tag(name: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::UnknownTag { name: name.into() })
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a file error.
    #[must_use]
    pub fn file_error(path: Option<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::FileError {
            path,
            reason: reason.into(),
        })
    }

    /// Returns true if this error is about the gesture table.
    #[must_use]
    pub fn is_gesture_table(&self) -> bool {
        matches!(
            self.kind,
            ConfigErrorKind::UnmappedGesture { .. }
                | ConfigErrorKind::DuplicateGesture { .. }
                | ConfigErrorKind::UnknownTag { .. }
        )
    }

    /// Returns true if this error came from loading a configuration file.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(self.kind, ConfigErrorKind::FileError { .. })
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConfigErrorKind::UnmappedGesture { tag } => {
                write!(
                    f,
                    "expression tag {} has no gesture; add it to the [gestures] table",
                    tag.marker()
                )
            }
            ConfigErrorKind::DuplicateGesture { gesture } => {
                write!(
                    f,
                    "gesture '{}' is mapped from more than one tag; each tag needs its own gesture",
                    gesture
                )
            }
            ConfigErrorKind::UnknownTag { name } => {
                write!(
                    f,
                    "unknown expression tag '{}' in gesture table; expected one of smile, nod, concern, wink, neutral",
                    name
                )
            }
            ConfigErrorKind::InvalidValue { field, reason } => {
                write!(f, "invalid configuration for '{}': {}", field, reason)
            }
            ConfigErrorKind::FileError { path, reason } => match path {
                Some(path) => write!(
                    f,
                    "failed to load configuration '{}': {}",
                    path.display(),
                    reason
                ),
                None => write!(f, "failed to load configuration: {}", reason),
            },
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actuator_connection_display() {
        let error = ActuatorError::connection("listen", "connection refused");

        let message = error.to_string();
        assert!(message.contains("listen"));
        assert!(message.contains("connection refused"));
        assert!(message.contains("reachable"));
    }

    #[test]
    fn actuator_request_failed_display() {
        let error = ActuatorError::request_failed("gesture", 400, "no such gesture");

        let message = error.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("no such gesture"));
    }

    #[test]
    fn actuator_is_transient_for_connection_and_server_errors() {
        assert!(ActuatorError::connection("speak", "reset").is_transient());
        assert!(ActuatorError::request_failed("speak", 503, "busy").is_transient());
    }

    #[test]
    fn actuator_is_not_transient_for_client_errors() {
        assert!(!ActuatorError::request_failed("gesture", 400, "bad").is_transient());
        assert!(!ActuatorError::protocol("listen", "partial before start").is_transient());
        assert!(!ActuatorError::invalid_response("users", "not json").is_transient());
    }

    #[test]
    fn config_unmapped_gesture_display() {
        let error = ConfigError::unmapped_gesture(ExpressionTag::Wink);

        let message = error.to_string();
        assert!(message.contains("[Wink]"));
        assert!(message.contains("[gestures]"));
        assert!(error.is_gesture_table());
    }

    #[test]
    fn config_file_error_display_with_path() {
        let error = ConfigError::file_error(Some(PathBuf::from("/etc/robot.toml")), "not found");

        let message = error.to_string();
        assert!(message.contains("/etc/robot.toml"));
        assert!(message.contains("not found"));
        assert!(error.is_file_error());
        assert!(!error.is_gesture_table());
    }

    #[test]
    fn config_invalid_value_display() {
        let error = ConfigError::invalid_value("idle_timeout_secs", "must be greater than 0");

        let message = error.to_string();
        assert!(message.contains("idle_timeout_secs"));
        assert!(message.contains("must be greater than 0"));
    }

    #[test]
    fn errors_are_clone_and_eq() {
        let error1 = ActuatorError::connection("attend", "timeout");
        let error2 = error1.clone();
        assert_eq!(error1, error2);

        let error3 = ActuatorError::connection("speak", "timeout");
        assert_ne!(error1, error3);
    }
}
