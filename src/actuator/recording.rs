//! Scripted actuator for tests and dry runs.
//!
//! Records every call in order and answers `listen` from a queue of scripted
//! results. It never touches hardware.

use super::{Actuator, Utterance, VisibleUser};
use crate::error::ActuatorError;
use crate::types::{GestureId, UserId};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// A call made against a [`RecordingActuator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorCall {
    /// `speak` was called
    Speak {
        /// Text that was spoken
        text: String,
        /// Whether the call was blocking
        blocking: bool,
    },
    /// `gesture` was called with this gesture name
    Gesture(String),
    /// `attend` was called with this user ID
    Attend(String),
    /// `list_users` was called
    ListUsers,
    /// `listen` was called
    Listen {
        /// Requested timeout
        timeout: Option<Duration>,
    },
}

#[derive(Debug)]
struct Script {
    listens: VecDeque<Result<Option<String>, ActuatorError>>,
    users: Result<Vec<VisibleUser>, ActuatorError>,
    failing: HashSet<&'static str>,
    calls: Vec<(Instant, ActuatorCall)>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            listens: VecDeque::new(),
            users: Ok(Vec::new()),
            failing: HashSet::new(),
            calls: Vec::new(),
        }
    }
}

/// Actuator double with scripted listen results and a call log.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    script: Mutex<Script>,
}

impl RecordingActuator {
    /// Creates an actuator with no users and nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an utterance for the next `listen` call.
    #[must_use]
    pub fn hears(self, text: impl Into<String>) -> Self {
        self.push_listen(Ok(Some(text.into())));
        self
    }

    /// Queues a silent `listen` result.
    #[must_use]
    pub fn hears_nothing(self) -> Self {
        self.push_listen(Ok(None));
        self
    }

    /// Queues a failing `listen` result.
    #[must_use]
    pub fn listen_fails(self, error: ActuatorError) -> Self {
        self.push_listen(Err(error));
        self
    }

    /// Sets the users returned by `list_users`.
    #[must_use]
    pub fn with_users(self, users: Vec<VisibleUser>) -> Self {
        self.lock().users = Ok(users);
        self
    }

    /// Makes `list_users` fail with the given error.
    #[must_use]
    pub fn users_fail(self, error: ActuatorError) -> Self {
        self.lock().users = Err(error);
        self
    }

    /// Makes every call to the named operation fail with a connection error.
    ///
    /// Operation names are `speak`, `gesture`, `attend`, `list_users`, `listen`.
    #[must_use]
    pub fn failing(self, operation: &'static str) -> Self {
        self.lock().failing.insert(operation);
        self
    }

    /// Returns every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.lock()
            .calls
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Returns every call recorded so far with the time it was made.
    ///
    /// Times come from tokio's clock, so they follow a paused test clock.
    #[must_use]
    pub fn timeline(&self) -> Vec<(Instant, ActuatorCall)> {
        self.lock().calls.clone()
    }

    /// Returns the texts passed to `speak`, in order.
    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ActuatorCall::Speak { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Returns the gestures performed, in order.
    #[must_use]
    pub fn gestures(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ActuatorCall::Gesture(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Returns how many scripted listen results are still queued.
    #[must_use]
    pub fn pending_listens(&self) -> usize {
        self.lock().listens.len()
    }

    fn push_listen(&self, result: Result<Option<String>, ActuatorError>) {
        self.lock().listens.push_back(result);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // A poisoned lock only means a test panicked mid-call; the log is still usable.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, operation: &'static str, call: ActuatorCall) -> Result<(), ActuatorError> {
        let mut script = self.lock();
        script.calls.push((Instant::now(), call));
        if script.failing.contains(operation) {
            return Err(ActuatorError::connection(operation, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl Actuator for RecordingActuator {
    async fn speak(&self, text: &str, blocking: bool) -> Result<(), ActuatorError> {
        self.record(
            "speak",
            ActuatorCall::Speak {
                text: text.to_string(),
                blocking,
            },
        )
    }

    async fn gesture(&self, gesture: &GestureId) -> Result<(), ActuatorError> {
        self.record("gesture", ActuatorCall::Gesture(gesture.to_string()))
    }

    async fn attend(&self, user: &UserId) -> Result<(), ActuatorError> {
        self.record("attend", ActuatorCall::Attend(user.to_string()))
    }

    async fn list_users(&self) -> Result<Vec<VisibleUser>, ActuatorError> {
        self.record("list_users", ActuatorCall::ListUsers)?;
        self.lock().users.clone()
    }

    async fn listen(&self, timeout: Option<Duration>) -> Result<Option<Utterance>, ActuatorError> {
        self.record("listen", ActuatorCall::Listen { timeout })?;
        match self.lock().listens.pop_front() {
            Some(Ok(Some(text))) => Ok(Utterance::new(text)),
            Some(Ok(None)) | None => Ok(None),
            Some(Err(e)) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listen_answers_from_script_then_silence() {
        let actuator = RecordingActuator::new().hears("hello").hears_nothing();

        let first = actuator.listen(None).await.unwrap();
        assert_eq!(first.map(|u| u.text), Some("hello".to_string()));
        assert!(actuator.listen(None).await.unwrap().is_none());
        assert!(actuator.listen(None).await.unwrap().is_none());
        assert_eq!(actuator.pending_listens(), 0);
    }

    #[tokio::test]
    async fn failing_operation_still_records_call() {
        let actuator = RecordingActuator::new().failing("gesture");
        let nod = GestureId::parse("Nod").unwrap();

        assert!(actuator.gesture(&nod).await.is_err());
        assert_eq!(actuator.gestures(), vec!["Nod".to_string()]);
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let actuator = RecordingActuator::new();
        actuator.speak("hi", true).await.unwrap();
        actuator.list_users().await.unwrap();

        assert_eq!(
            actuator.calls(),
            vec![
                ActuatorCall::Speak {
                    text: "hi".to_string(),
                    blocking: true
                },
                ActuatorCall::ListUsers,
            ]
        );
    }
}
