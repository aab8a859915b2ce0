//! Furhat Realtime API listener.
//!
//! The REST `listen` call cannot carry a no-speech timeout, so the robot
//! always uses its own. The Realtime API can: each listen attempt opens the
//! event socket, sends `request.listen.start` with the caller's timeout, and
//! reads `response.hear.*` / `response.listen.end` events until the attempt
//! is over.

use super::events::{ListenEvent, ListenEventSource, ListenEventStream};
use crate::error::ActuatorError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

/// Seconds of silence after speech before the robot finalizes the transcript.
const END_SPEECH_TIMEOUT_SECS: f64 = 1.5;

/// Listen events from the robot's Realtime API event socket.
#[derive(Debug, Clone)]
pub struct FurhatRealtime {
    /// Event socket URL, e.g. `ws://localhost:9000/v1/events`
    url: String,
}

/// An event frame pushed by the robot. Only the fields used for listening.
#[derive(Debug, Clone, Deserialize)]
struct RealtimeEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl FurhatRealtime {
    /// Creates a listener for the event socket at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Returns the event socket URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Builds the `request.listen.start` frame.
///
/// Without a timeout the robot applies its default no-speech timeout.
fn listen_request(timeout: Option<Duration>) -> serde_json::Value {
    let mut request = json!({
        "type": "request.listen.start",
        "partial": true,
        "concat": true,
        "stop_no_speech": true,
        "stop_user_end": true,
        "end_speech_timeout": END_SPEECH_TIMEOUT_SECS,
    });
    if let Some(timeout) = timeout {
        request["no_speech_timeout"] = json!(timeout.as_secs_f64());
    }
    request
}

/// Maps one text frame to a listen event. Frames unrelated to listening
/// yield `None`.
fn parse_event(frame: &str) -> Result<Option<ListenEvent>, ActuatorError> {
    let event: RealtimeEvent = serde_json::from_str(frame)
        .map_err(|e| ActuatorError::invalid_response("listen", e.to_string()))?;
    let text = event.text.unwrap_or_default();

    Ok(match event.event_type.as_str() {
        "response.hear.start" => Some(ListenEvent::SpeechStarted),
        "response.hear.partial" => Some(ListenEvent::Partial { text }),
        "response.hear.end" => Some(ListenEvent::Heard { text }),
        "response.listen.end" => Some(ListenEvent::NoSpeech),
        _ => None,
    })
}

#[async_trait]
impl ListenEventSource for FurhatRealtime {
    async fn start_listening(
        &self,
        timeout: Option<Duration>,
    ) -> Result<ListenEventStream, ActuatorError> {
        let (mut socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ActuatorError::connection("listen", e.to_string()))?;

        socket
            .send(Message::Text(listen_request(timeout).to_string()))
            .await
            .map_err(|e| ActuatorError::connection("listen", e.to_string()))?;
        tracing::debug!(url = %self.url, ?timeout, "listen started");

        Ok(Box::pin(async_stream::stream! {
            while let Some(message) = socket.next().await {
                match message {
                    Ok(Message::Text(frame)) => match parse_event(&frame) {
                        Ok(Some(event)) => {
                            let terminal = event.is_terminal();
                            yield Ok(event);
                            if terminal {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            break;
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(ActuatorError::connection("listen", e.to_string()));
                        break;
                    }
                }
            }
            // Closing is best effort; the attempt is already over.
            let _ = socket.close(None).await;
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::events::collect_utterance;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one listen attempt, replying with `frames` and reporting the
    /// request frame it received.
    async fn serve_once(frames: Vec<&'static str>) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/v1/events", listener.local_addr().unwrap());
        let (sent, received) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
            if let Some(Ok(Message::Text(request))) = socket.next().await {
                let _ = sent.send(request);
            }
            for frame in frames {
                socket.send(Message::Text(frame.to_string())).await.unwrap();
            }
            while socket.next().await.is_some() {}
        });

        (url, received)
    }

    #[test]
    fn listen_request_carries_timeout() {
        let request = listen_request(Some(Duration::from_secs(5)));
        assert_eq!(request["type"], "request.listen.start");
        assert_eq!(request["no_speech_timeout"], 5.0);
        assert_eq!(request["stop_user_end"], true);

        let request = listen_request(None);
        assert!(request.get("no_speech_timeout").is_none());
    }

    #[test]
    fn parse_event_maps_listen_frames() {
        assert_eq!(
            parse_event(r#"{"type": "response.hear.start"}"#).unwrap(),
            Some(ListenEvent::SpeechStarted)
        );
        assert_eq!(
            parse_event(r#"{"type": "response.hear.end", "text": "hello"}"#).unwrap(),
            Some(ListenEvent::Heard {
                text: "hello".to_string()
            })
        );
        assert_eq!(
            parse_event(r#"{"type": "response.listen.end", "cause": "silence"}"#).unwrap(),
            Some(ListenEvent::NoSpeech)
        );
        assert_eq!(
            parse_event(r#"{"type": "response.listen.start"}"#).unwrap(),
            None
        );
    }

    #[test]
    fn parse_event_rejects_malformed_frame() {
        let err = parse_event("not json").unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn listen_attempt_yields_final_transcript() {
        let (url, request) = serve_once(vec![
            r#"{"type": "response.listen.start"}"#,
            r#"{"type": "response.hear.start"}"#,
            r#"{"type": "response.hear.partial", "text": "where is"}"#,
            r#"{"type": "response.hear.end", "text": "where is room 101?"}"#,
        ])
        .await;
        let source = FurhatRealtime::new(url);

        let events = source
            .start_listening(Some(Duration::from_secs(5)))
            .await
            .unwrap();
        let utterance = collect_utterance(events).await.unwrap().unwrap();

        assert_eq!(utterance.text, "where is room 101?");
        let request: serde_json::Value =
            serde_json::from_str(&request.await.unwrap()).unwrap();
        assert_eq!(request["no_speech_timeout"], 5.0);
    }

    #[tokio::test]
    async fn listen_end_without_speech_is_silence() {
        let (url, _request) = serve_once(vec![
            r#"{"type": "response.listen.start"}"#,
            r#"{"type": "response.listen.end", "cause": "silence"}"#,
        ])
        .await;
        let source = FurhatRealtime::new(url);

        let events = source.start_listening(None).await.unwrap();
        assert_eq!(collect_utterance(events).await, Ok(None));
    }

    #[tokio::test]
    async fn unreachable_socket_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/v1/events", listener.local_addr().unwrap());
        drop(listener);

        let err = FurhatRealtime::new(url)
            .start_listening(None)
            .await
            .err()
            .expect("expected a connection error");
        assert!(err.is_transient());
    }
}
