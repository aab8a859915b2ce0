//! Attention tracking.
//!
//! Keeps the robot facing the person it should be listening to. The Furhat
//! microphone is directional, so attending to the active speaker is what
//! makes listening work in a crowd.

use crate::actuator::{Actuator, VisibleUser};
use crate::types::UserId;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Chooses whom the robot attends to.
#[derive(Debug, Clone)]
pub struct AttentionTracker {
    actuator: Arc<dyn Actuator>,
    current: Option<UserId>,
}

impl AttentionTracker {
    /// Creates a tracker that has not attended to anyone yet.
    #[must_use]
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self {
            actuator,
            current: None,
        }
    }

    /// Looks at the visible users and attends to the best candidate.
    ///
    /// Prefers the first user flagged as speaking, otherwise the first user
    /// listed (the closest, by the actuator's ordering). Returns `None` when
    /// nobody is visible, and forgets the previously attended user. If
    /// querying or attending fails, the failure is logged and the previously
    /// attended user is returned.
    pub async fn refresh(&mut self) -> Option<UserId> {
        let users = match self.actuator.list_users().await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "could not list users; keeping attention");
                return self.current.clone();
            }
        };

        let Some(target) = select_target(&users) else {
            match self.current.take() {
                Some(previous) => info!(user = %previous, "attended user left"),
                None => debug!("no users visible"),
            }
            return None;
        };

        if let Err(e) = self.actuator.attend(target).await {
            warn!(error = %e, user = %target, "could not attend; keeping attention");
            return self.current.clone();
        }

        if self.current.as_ref() != Some(target) {
            info!(
                user = %target,
                previous = ?self.current.as_ref().map(UserId::as_str),
                "attention switched"
            );
            self.current = Some(target.clone());
        }

        self.current.clone()
    }

    /// Returns the user currently attended to, or `None` if nobody was
    /// visible at the last successful refresh.
    #[must_use]
    pub fn current(&self) -> Option<&UserId> {
        self.current.as_ref()
    }
}

/// Picks the user to attend to from a proximity-ordered list.
#[must_use]
pub fn select_target(users: &[VisibleUser]) -> Option<&UserId> {
    users
        .iter()
        .find(|user| user.is_speaking == Some(true))
        .or_else(|| users.first())
        .map(|user| &user.id)
}
