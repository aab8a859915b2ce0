//! Expression tags and their mapping to robot gestures.
//!
//! The language model marks up its replies with bracketed tags such as
//! `[Smile]` or `[Concern]`. Each tag is mapped to a gesture name the robot
//! understands through a [`GestureMap`].

use crate::error::ConfigError;
use crate::types::GestureId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A facial expression the model can request inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionTag {
    /// Greetings, jokes, positive confirmations
    Smile,
    /// Agreement or confirming understanding
    Nod,
    /// The user is frustrated or reporting a problem
    Concern,
    /// Playful remarks
    Wink,
    /// Plain information delivery
    Neutral,
}

impl ExpressionTag {
    /// Every tag the parser recognizes.
    pub const ALL: [ExpressionTag; 5] = [
        ExpressionTag::Smile,
        ExpressionTag::Nod,
        ExpressionTag::Concern,
        ExpressionTag::Wink,
        ExpressionTag::Neutral,
    ];

    /// The lowercase name used in configuration files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Smile => "smile",
            Self::Nod => "nod",
            Self::Concern => "concern",
            Self::Wink => "wink",
            Self::Neutral => "neutral",
        }
    }

    /// The inline marker as it appears in model output.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Smile => "[Smile]",
            Self::Nod => "[Nod]",
            Self::Concern => "[Concern]",
            Self::Wink => "[Wink]",
            Self::Neutral => "[Neutral]",
        }
    }

    /// Looks up a tag by name, ignoring case and surrounding brackets.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_lowercase();
        Self::ALL.into_iter().find(|tag| tag.name() == bare)
    }

    /// Gesture used when no `[gestures]` table is configured.
    #[must_use]
    pub fn default_gesture(self) -> &'static str {
        match self {
            Self::Smile => "BigSmile",
            Self::Nod => "Nod",
            Self::Concern => "ExpressSad",
            Self::Wink => "Wink",
            Self::Neutral => "ExpressNeutral",
        }
    }
}

impl fmt::Display for ExpressionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Returns the default gesture table in its configuration-file form.
#[must_use]
pub fn default_gesture_table() -> BTreeMap<String, String> {
    ExpressionTag::ALL
        .into_iter()
        .map(|tag| (tag.name().to_string(), tag.default_gesture().to_string()))
        .collect()
}

/// Mapping from expression tags to robot gestures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureMap {
    gestures: HashMap<ExpressionTag, GestureId>,
}

impl GestureMap {
    /// Creates an empty map (every tag unmapped).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            gestures: HashMap::new(),
        }
    }

    /// Adds or replaces the gesture for a tag.
    #[must_use]
    pub fn with(mut self, tag: ExpressionTag, gesture: GestureId) -> Self {
        self.gestures.insert(tag, gesture);
        self
    }

    /// Builds a map from a `[gestures]` table.
    ///
    /// Entries that cannot be used (unknown tag names, malformed or empty
    /// gesture names) are returned as errors alongside the usable map. An
    /// empty gesture name deliberately leaves the tag unmapped.
    #[must_use]
    pub fn from_table(table: &BTreeMap<String, String>) -> (Self, Vec<ConfigError>) {
        let mut map = Self::empty();
        let mut errors = Vec::new();

        for (name, gesture) in table {
            let Some(tag) = ExpressionTag::from_name(name) else {
                errors.push(ConfigError::unknown_tag(name));
                continue;
            };
            if gesture.trim().is_empty() {
                continue;
            }
            match GestureId::parse(gesture) {
                Ok(id) => {
                    map.gestures.insert(tag, id);
                }
                Err(e) => errors.push(ConfigError::invalid_value(
                    format!("gestures.{}", tag.name()),
                    e.to_string(),
                )),
            }
        }

        (map, errors)
    }

    /// Returns the gesture for a tag, or a configuration error if unmapped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::unmapped_gesture` when the tag has no entry.
    pub fn gesture_for(&self, tag: ExpressionTag) -> Result<&GestureId, ConfigError> {
        self.gestures
            .get(&tag)
            .ok_or_else(|| ConfigError::unmapped_gesture(tag))
    }

    /// Checks that every tag is mapped and no two tags share a gesture.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors: Vec<ConfigError> = ExpressionTag::ALL
            .into_iter()
            .filter(|tag| !self.gestures.contains_key(tag))
            .map(ConfigError::unmapped_gesture)
            .collect();

        let mut seen: BTreeMap<&GestureId, usize> = BTreeMap::new();
        for gesture in self.gestures.values() {
            *seen.entry(gesture).or_default() += 1;
        }
        errors.extend(
            seen.into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(gesture, _)| ConfigError::duplicate_gesture(gesture.as_str())),
        );

        errors
    }

    /// Returns the number of mapped tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    /// Returns true if no tag is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }
}

impl Default for GestureMap {
    fn default() -> Self {
        let (map, _) = Self::from_table(&default_gesture_table());
        map
    }
}
