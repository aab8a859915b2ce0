//! Name of a physical gesture understood by the robot.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated gesture identifier such as `BigSmile` or `Nod`.
///
/// Gesture names are passed verbatim to the robot, so they may not contain
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureId(String);

/// Error returned when attempting to create an invalid gesture ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidGestureId {
    /// The gesture name was empty
    Empty,
    /// The gesture name contained whitespace
    ContainsWhitespace(String),
}

impl fmt::Display for InvalidGestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "invalid gesture: name cannot be empty"),
            Self::ContainsWhitespace(name) => {
                write!(f, "invalid gesture '{name}': name cannot contain whitespace")
            }
        }
    }
}

impl std::error::Error for InvalidGestureId {}

impl GestureId {
    /// Parses a gesture ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or contains whitespace.
    pub fn parse(s: &str) -> Result<Self, InvalidGestureId> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidGestureId::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(InvalidGestureId::ContainsWhitespace(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the gesture name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GestureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GestureId {
    type Err = InvalidGestureId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for GestureId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GestureId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_gesture() {
        assert_eq!(GestureId::parse("BigSmile").unwrap().as_str(), "BigSmile");
    }

    #[test]
    fn parse_rejects_whitespace() {
        assert!(matches!(
            GestureId::parse("Big Smile"),
            Err(InvalidGestureId::ContainsWhitespace(_))
        ));
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(GestureId::parse(""), Err(InvalidGestureId::Empty));
    }
}
