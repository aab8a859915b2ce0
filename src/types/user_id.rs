//! Identifier of a person detected by the robot.
//!
//! The robot reports users with opaque string IDs (e.g. `"user-3"`). A
//! `UserId` is validated once when it crosses the actuator boundary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated user identifier as reported by the robot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

/// Error returned when attempting to create an invalid user ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidUserId {
    /// The identifier was empty or only whitespace
    Empty,
}

impl fmt::Display for InvalidUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "invalid user ID: identifier cannot be empty"),
        }
    }
}

impl std::error::Error for InvalidUserId {}

impl UserId {
    /// Parses a user ID, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUserId::Empty` if nothing remains after trimming.
    pub fn parse(s: &str) -> Result<Self, InvalidUserId> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidUserId::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = InvalidUserId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
