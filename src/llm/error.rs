//! Language model error types.
//!
//! A [`GenerationError`] means the model produced no usable reply. The
//! dialogue session passes it on untouched; deciding how to recover is the
//! controller's job.

use std::fmt;
use std::time::Duration;

/// Errors that can occur while generating a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    /// The specific error that occurred
    pub kind: GenerationErrorKind,
}

/// Specific generation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// Network error when communicating with the API
    Network {
        /// Description of the network error
        message: String,
    },
    /// Rate limit or quota exceeded
    RateLimited {
        /// Time to wait before retrying
        retry_after: Duration,
    },
    /// API returned an error response
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },
    /// Authentication failed
    AuthenticationFailed {
        /// Reason for authentication failure
        reason: String,
    },
    /// The response body could not be parsed
    ParseError {
        /// Description of the parse error
        message: String,
    },
    /// The model answered with no text (e.g. blocked by a safety filter)
    EmptyResponse {
        /// Why the reply was empty, if the API said
        reason: Option<String>,
    },
    /// Configuration error
    InvalidConfig {
        /// The configuration field that was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
    /// Request timeout
    Timeout {
        /// The timeout duration that was exceeded
        duration: Duration,
    },
}

impl GenerationError {
    /// Creates a new GenerationError with the given kind.
    #[must_use]
    pub fn new(kind: GenerationErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Network {
            message: message.into(),
        })
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::new(GenerationErrorKind::RateLimited { retry_after })
    }

    /// Creates an API error.
    #[must_use]
    pub fn api_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::ApiError {
            status_code,
            message: message.into(),
        })
    }

    /// Creates an authentication failed error.
    #[must_use]
    pub fn authentication_failed(reason: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::AuthenticationFailed {
            reason: reason.into(),
        })
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::ParseError {
            message: message.into(),
        })
    }

    /// Creates an empty response error.
    #[must_use]
    pub fn empty_response(reason: Option<String>) -> Self {
        Self::new(GenerationErrorKind::EmptyResponse { reason })
    }

    /// Creates an invalid config error.
    #[must_use]
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(duration: Duration) -> Self {
        Self::new(GenerationErrorKind::Timeout { duration })
    }

    /// Returns true if the same request may succeed later.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            GenerationErrorKind::Network { .. }
                | GenerationErrorKind::RateLimited { .. }
                | GenerationErrorKind::Timeout { .. }
                | GenerationErrorKind::ApiError {
                    status_code: 500..=599,
                    ..
                }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            GenerationErrorKind::InvalidConfig { .. }
                | GenerationErrorKind::AuthenticationFailed { .. }
        )
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation failed: ")?;
        match &self.kind {
            GenerationErrorKind::Network { message } => {
                write!(f, "network error: {}", message)
            }
            GenerationErrorKind::RateLimited { retry_after } => {
                write!(
                    f,
                    "rate limited; retry after {} seconds",
                    retry_after.as_secs()
                )
            }
            GenerationErrorKind::ApiError {
                status_code,
                message,
            } => {
                write!(f, "API error (HTTP {}): {}", status_code, message)
            }
            GenerationErrorKind::AuthenticationFailed { reason } => {
                write!(
                    f,
                    "authentication failed: {}; check the API key environment variable",
                    reason
                )
            }
            GenerationErrorKind::ParseError { message } => {
                write!(f, "failed to parse response: {}", message)
            }
            GenerationErrorKind::EmptyResponse { reason } => match reason {
                Some(reason) => write!(f, "model returned no text ({})", reason),
                None => write!(f, "model returned no text"),
            },
            GenerationErrorKind::InvalidConfig { field, reason } => {
                write!(f, "invalid configuration for '{}': {}", field, reason)
            }
            GenerationErrorKind::Timeout { duration } => {
                write!(f, "request timed out after {} seconds", duration.as_secs())
            }
        }
    }
}

impl std::error::Error for GenerationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_display() {
        let error = GenerationError::network("connection refused");

        let message = error.to_string();
        assert!(message.contains("generation failed"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn rate_limited_display() {
        let error = GenerationError::rate_limited(Duration::from_secs(30));

        let message = error.to_string();
        assert!(message.contains("rate limited"));
        assert!(message.contains("30"));
    }

    #[test]
    fn api_error_display() {
        let error = GenerationError::api_error(400, "invalid model parameter");

        let message = error.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("invalid model parameter"));
    }

    #[test]
    fn empty_response_display_with_reason() {
        let error = GenerationError::empty_response(Some("SAFETY".to_string()));
        assert!(error.to_string().contains("SAFETY"));
    }

    #[test]
    fn is_retriable_for_transport_errors() {
        assert!(GenerationError::network("timeout").is_retriable());
        assert!(GenerationError::rate_limited(Duration::from_secs(10)).is_retriable());
        assert!(GenerationError::api_error(503, "unavailable").is_retriable());
        assert!(GenerationError::timeout(Duration::from_secs(60)).is_retriable());
    }

    #[test]
    fn is_not_retriable_for_client_errors() {
        assert!(!GenerationError::api_error(400, "bad request").is_retriable());
        assert!(!GenerationError::authentication_failed("invalid key").is_retriable());
        assert!(!GenerationError::empty_response(None).is_retriable());
    }

    #[test]
    fn is_configuration_for_auth_and_config() {
        assert!(GenerationError::authentication_failed("no key").is_configuration());
        assert!(GenerationError::invalid_config("model", "empty").is_configuration());
        assert!(!GenerationError::network("reset").is_configuration());
    }

    #[test]
    fn errors_are_eq() {
        let error1 = GenerationError::empty_response(None);
        let error2 = error1.clone();
        assert_eq!(error1, error2);
        assert_ne!(error1, GenerationError::network("x"));
    }
}
