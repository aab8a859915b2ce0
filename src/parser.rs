//! Expression tag parsing and execution.
//!
//! Splits a model reply such as `"[Smile] Hello there. [Nod] How can I help?"`
//! into an ordered sequence of [`ActionSegment`]s and plays it on an
//! [`Actuator`]: each text run is spoken to completion, then the gesture for
//! the marker that closed it is started.

use crate::actuator::Actuator;
use crate::error::ConfigError;
use crate::expression::{ExpressionTag, GestureMap};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// One step of a performed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSegment {
    /// Speak this text (never empty, already trimmed)
    Speak(String),
    /// Perform the gesture mapped to this tag
    Perform(ExpressionTag),
}

impl fmt::Display for ActionSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speak(text) => write!(f, "speak {:?}", text),
            Self::Perform(tag) => write!(f, "perform {}", tag),
        }
    }
}

/// Counts of what happened while performing one reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformSummary {
    /// Speak segments the actuator completed
    pub spoken: usize,
    /// Gestures the actuator accepted
    pub gestures: usize,
    /// Markers with no gesture mapping
    pub unmapped: usize,
    /// Actuator calls that failed
    pub failed: usize,
}

/// Parses tagged replies and drives the actuator with them.
#[derive(Debug, Clone)]
pub struct TagParser {
    gestures: GestureMap,
    actuator: Arc<dyn Actuator>,
    pattern: Regex,
}

impl TagParser {
    /// Creates a parser recognizing every [`ExpressionTag`] marker.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::invalid_value` if the marker pattern fails to
    /// compile.
    pub fn new(gestures: GestureMap, actuator: Arc<dyn Actuator>) -> Result<Self, ConfigError> {
        let alternatives: Vec<String> = ExpressionTag::ALL
            .into_iter()
            .map(|tag| regex::escape(tag.marker()))
            .collect();
        let pattern = Regex::new(&format!("(?i){}", alternatives.join("|")))
            .map_err(|e| ConfigError::invalid_value("expression markers", e.to_string()))?;

        Ok(Self {
            gestures,
            actuator,
            pattern,
        })
    }

    /// Splits `raw` into speech and gesture segments, in order.
    ///
    /// Text between markers is trimmed; whitespace-only runs are dropped.
    /// Bracketed words that are not known markers stay in the spoken text.
    #[must_use]
    pub fn parse(&self, raw: &str) -> Vec<ActionSegment> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for found in self.pattern.find_iter(raw) {
            push_speech(&mut segments, &raw[cursor..found.start()]);
            if let Some(tag) = ExpressionTag::from_name(found.as_str()) {
                segments.push(ActionSegment::Perform(tag));
            }
            cursor = found.end();
        }
        push_speech(&mut segments, &raw[cursor..]);

        segments
    }

    /// Parses `raw` and plays it on the actuator.
    ///
    /// Speech is blocking. Failures are logged per segment and the remaining
    /// segments still run.
    pub async fn perform(&self, raw: &str) -> PerformSummary {
        let mut summary = PerformSummary::default();

        for segment in self.parse(raw) {
            debug!(actuator = self.actuator.name(), %segment, "performing");
            match segment {
                ActionSegment::Speak(text) => match self.actuator.speak(&text, true).await {
                    Ok(()) => summary.spoken += 1,
                    Err(e) => {
                        warn!(error = %e, "speech failed; continuing with reply");
                        summary.failed += 1;
                    }
                },
                ActionSegment::Perform(tag) => {
                    let gesture = match self.gestures.gesture_for(tag) {
                        Ok(gesture) => gesture,
                        Err(e) => {
                            warn!(error = %e, "skipping expression");
                            summary.unmapped += 1;
                            continue;
                        }
                    };
                    match self.actuator.gesture(gesture).await {
                        Ok(()) => summary.gestures += 1,
                        Err(e) => {
                            warn!(error = %e, %gesture, "gesture failed; continuing with reply");
                            summary.failed += 1;
                        }
                    }
                }
            }
        }

        summary
    }

    /// Returns the gesture mapping in use.
    #[must_use]
    pub fn gestures(&self) -> &GestureMap {
        &self.gestures
    }
}

fn push_speech(segments: &mut Vec<ActionSegment>, run: &str) {
    let text = run.trim();
    if !text.is_empty() {
        segments.push(ActionSegment::Speak(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{ActuatorCall, RecordingActuator};
    use crate::types::GestureId;

    fn parser_with(actuator: Arc<RecordingActuator>, gestures: GestureMap) -> TagParser {
        TagParser::new(gestures, actuator).unwrap()
    }

    fn parser() -> TagParser {
        parser_with(Arc::new(RecordingActuator::new()), GestureMap::default())
    }

    fn speak(text: &str) -> ActionSegment {
        ActionSegment::Speak(text.to_string())
    }

    #[test]
    fn parse_interleaves_speech_and_gestures() {
        let segments = parser().parse("[Smile] Hello there. [Nod] How can I help?");

        assert_eq!(
            segments,
            vec![
                ActionSegment::Perform(ExpressionTag::Smile),
                speak("Hello there."),
                ActionSegment::Perform(ExpressionTag::Nod),
                speak("How can I help?"),
            ]
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        let segments = parser().parse("ok [SMILE] fine [wInK]");

        assert_eq!(
            segments,
            vec![
                speak("ok"),
                ActionSegment::Perform(ExpressionTag::Smile),
                speak("fine"),
                ActionSegment::Perform(ExpressionTag::Wink),
            ]
        );
    }

    #[test]
    fn parse_n_markers_gives_n_performs() {
        let raw = "A [Nod] B [Concern] [Wink] C [Neutral]";

        let segments = parser().parse(raw);

        let performs = segments
            .iter()
            .filter(|s| matches!(s, ActionSegment::Perform(_)))
            .count();
        let speaks: Vec<_> = segments
            .iter()
            .filter_map(|s| match s {
                ActionSegment::Speak(text) => Some(text.as_str()),
                ActionSegment::Perform(_) => None,
            })
            .collect();
        assert_eq!(performs, 4);
        assert!(speaks.len() <= 5);
        assert!(speaks.iter().all(|text| !text.contains('[')));
    }

    #[test]
    fn parse_without_markers_is_one_trimmed_speak() {
        assert_eq!(parser().parse("  just text \n"), vec![speak("just text")]);
    }

    #[test]
    fn parse_blank_input_is_empty() {
        assert!(parser().parse("").is_empty());
        assert!(parser().parse("   ").is_empty());
    }

    #[test]
    fn consecutive_markers_have_no_speech_between() {
        let segments = parser().parse("[Smile][Nod]  [Wink]");

        assert_eq!(
            segments,
            vec![
                ActionSegment::Perform(ExpressionTag::Smile),
                ActionSegment::Perform(ExpressionTag::Nod),
                ActionSegment::Perform(ExpressionTag::Wink),
            ]
        );
    }

    #[test]
    fn unknown_brackets_stay_in_speech() {
        let segments = parser().parse("Press [Enter] to continue [Smile]");

        assert_eq!(
            segments,
            vec![
                speak("Press [Enter] to continue"),
                ActionSegment::Perform(ExpressionTag::Smile),
            ]
        );
    }

    #[tokio::test]
    async fn perform_drives_actuator_in_order() {
        let actuator = Arc::new(RecordingActuator::new());
        let gestures = GestureMap::empty()
            .with(ExpressionTag::Smile, GestureId::parse("BigSmile").unwrap())
            .with(ExpressionTag::Nod, GestureId::parse("Nod").unwrap());
        let parser = parser_with(actuator.clone(), gestures);

        let summary = parser
            .perform("[Smile] Hello there. [Nod] How can I help?")
            .await;

        assert_eq!(
            actuator.calls(),
            vec![
                ActuatorCall::Gesture("BigSmile".to_string()),
                ActuatorCall::Speak {
                    text: "Hello there.".to_string(),
                    blocking: true
                },
                ActuatorCall::Gesture("Nod".to_string()),
                ActuatorCall::Speak {
                    text: "How can I help?".to_string(),
                    blocking: true
                },
            ]
        );
        assert_eq!(summary.spoken, 2);
        assert_eq!(summary.gestures, 2);
    }

    #[tokio::test]
    async fn perform_skips_unmapped_tags() {
        let actuator = Arc::new(RecordingActuator::new());
        let gestures =
            GestureMap::empty().with(ExpressionTag::Nod, GestureId::parse("Nod").unwrap());
        let parser = parser_with(actuator.clone(), gestures);

        let summary = parser.perform("[Wink] Sure. [Nod]").await;

        assert_eq!(actuator.gestures(), vec!["Nod".to_string()]);
        assert_eq!(actuator.spoken(), vec!["Sure.".to_string()]);
        assert_eq!(summary.unmapped, 1);
    }

    #[tokio::test]
    async fn perform_continues_after_failures() {
        let actuator = Arc::new(RecordingActuator::new().failing("gesture"));
        let parser = parser_with(actuator.clone(), GestureMap::default());

        let summary = parser.perform("One. [Smile] Two. [Nod] Three.").await;

        assert_eq!(
            actuator.spoken(),
            vec!["One.".to_string(), "Two.".to_string(), "Three.".to_string()]
        );
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.spoken, 3);
    }
}
