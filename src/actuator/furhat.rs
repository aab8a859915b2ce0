//! Furhat Remote API actuator.
//!
//! Talks to the robot's REST endpoint (`http://{host}:{port}/furhat`) with
//! plain request/response calls. `say` with `blocking=true` only returns once
//! the robot has finished speaking, which is what the tag parser relies on.
//!
//! REST `listen` always runs until the robot's own no-speech timeout. When a
//! Realtime API port is configured, listening goes through
//! [`FurhatRealtime`] instead so that shorter timeouts reach the robot.

use super::events::{collect_utterance, ListenEventSource};
use super::realtime::FurhatRealtime;
use super::{Actuator, Utterance, VisibleUser};
use crate::config::RobotConfig;
use crate::error::ActuatorError;
use crate::types::{GestureId, UserId};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for one listen attempt, speech included.
///
/// Well above the robot's default no-speech timeout, so a REST listen is never
/// abandoned while the robot is still listening.
const LISTEN_LIMIT: Duration = Duration::from_secs(60);

/// Upper bound for a blocking `say` call.
const SPEAK_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the Furhat Remote API.
#[derive(Debug, Clone)]
pub struct FurhatClient {
    /// HTTP client
    client: Client,
    /// Base URL, e.g. `http://localhost:54321/furhat`
    base_url: String,
    /// Recognition language passed to `listen`
    language: String,
    /// Event socket used for listening, when configured
    realtime: Option<FurhatRealtime>,
}

/// Status body returned by most Furhat endpoints.
#[derive(Debug, Clone, Deserialize)]
struct FurhatStatus {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: String,
}

/// A user as reported by `GET /users`.
#[derive(Debug, Clone, Deserialize)]
struct FurhatUser {
    id: String,
    #[serde(default, alias = "isSpeaking", alias = "speech")]
    is_speaking: Option<bool>,
}

impl FurhatClient {
    /// Creates a client for the robot described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the HTTP client cannot be created.
    pub fn new(config: &RobotConfig) -> Result<Self, ActuatorError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ActuatorError::connection("connect", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            language: config.input_language.clone(),
            realtime: config.realtime_url().map(FurhatRealtime::new),
        })
    }

    /// Applies the configured voice and face to the robot.
    ///
    /// Failures are logged and do not stop the caller: a robot with the
    /// wrong voice is still usable.
    pub async fn apply_persona(&self, config: &RobotConfig) {
        tracing::info!(
            host = %config.host,
            voice = %config.voice_name,
            character = %config.character_name,
            "applying persona to robot"
        );

        if let Err(e) = self
            .post("voice", &[("name", config.voice_name.as_str())], None)
            .await
        {
            tracing::warn!(error = %e, "failed to set voice");
        }

        // Setting the face also resets the expression to neutral.
        if let Err(e) = self
            .post(
                "face",
                &[
                    ("character", config.character_name.as_str()),
                    ("mask", config.mask_type.as_str()),
                ],
                None,
            )
            .await
        {
            tracing::warn!(error = %e, "failed to set face");
        }
    }

    async fn listen_rest(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<Utterance>, ActuatorError> {
        if let Some(timeout) = timeout {
            tracing::debug!(
                ?timeout,
                "REST listen cannot set a no-speech timeout; the robot's default applies"
            );
        }

        let response = self
            .client
            .get(self.endpoint("listen"))
            .query(&[("language", self.language.as_str())])
            .timeout(LISTEN_LIMIT)
            .send()
            .await
            .map_err(|e| ActuatorError::connection("listen", e.to_string()))?;

        let status: FurhatStatus = Self::read_json("listen", response).await?;
        if !status.success {
            return Ok(None);
        }
        Ok(Utterance::new(status.message))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post(
        &self,
        operation: &'static str,
        query: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<FurhatStatus, ActuatorError> {
        let mut request = self.client.post(self.endpoint(operation)).query(query);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ActuatorError::connection(operation, e.to_string()))?;
        Self::read_json(operation, response).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ActuatorError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            };
            return Err(ActuatorError::request_failed(
                operation,
                status.as_u16(),
                message,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ActuatorError::invalid_response(operation, e.to_string()))
    }
}

#[async_trait]
impl Actuator for FurhatClient {
    async fn speak(&self, text: &str, blocking: bool) -> Result<(), ActuatorError> {
        // Blocking speech can outlast the default request timeout.
        let timeout = blocking.then_some(SPEAK_TIMEOUT);
        let blocking = if blocking { "true" } else { "false" };
        let status = self
            .post("say", &[("text", text), ("blocking", blocking)], timeout)
            .await?;
        if !status.success {
            return Err(ActuatorError::invalid_response("speak", status.message));
        }
        Ok(())
    }

    async fn gesture(&self, gesture: &GestureId) -> Result<(), ActuatorError> {
        let status = self
            .post(
                "gesture",
                &[("name", gesture.as_str()), ("blocking", "false")],
                None,
            )
            .await?;
        if !status.success {
            return Err(ActuatorError::invalid_response("gesture", status.message));
        }
        Ok(())
    }

    async fn attend(&self, user: &UserId) -> Result<(), ActuatorError> {
        self.post("attend", &[("userid", user.as_str())], None)
            .await
            .map(|_| ())
    }

    async fn list_users(&self) -> Result<Vec<VisibleUser>, ActuatorError> {
        let response = self
            .client
            .get(self.endpoint("users"))
            .send()
            .await
            .map_err(|e| ActuatorError::connection("list_users", e.to_string()))?;
        let users: Vec<FurhatUser> = Self::read_json("list_users", response).await?;

        // Users with unusable IDs cannot be attended to, so they are dropped here.
        Ok(users
            .into_iter()
            .filter_map(|user| {
                let id = UserId::parse(&user.id).ok()?;
                Some(VisibleUser {
                    id,
                    is_speaking: user.is_speaking,
                })
            })
            .collect())
    }

    async fn listen(&self, timeout: Option<Duration>) -> Result<Option<Utterance>, ActuatorError> {
        let Some(realtime) = &self.realtime else {
            return self.listen_rest(timeout).await;
        };

        let attempt = async {
            let events = realtime.start_listening(timeout).await?;
            collect_utterance(events).await
        };
        tokio::time::timeout(LISTEN_LIMIT, attempt)
            .await
            .map_err(|_| {
                ActuatorError::connection("listen", "robot never ended the listen attempt")
            })?
    }

    fn name(&self) -> &'static str {
        "furhat"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn new_builds_base_url_from_config() {
        let config = RobotConfig::default().with_host("10.0.0.5");
        let client = FurhatClient::new(&config).unwrap();

        assert_eq!(client.endpoint("say"), "http://10.0.0.5:54321/furhat/say");
        assert_eq!(client.language, "en-US");
    }

    #[test]
    fn furhat_user_accepts_speaking_aliases() {
        let user: FurhatUser = serde_json::from_str(r#"{"id": "u1", "isSpeaking": true}"#).unwrap();
        assert_eq!(user.is_speaking, Some(true));

        let user: FurhatUser = serde_json::from_str(r#"{"id": "u2", "location": {}}"#).unwrap();
        assert_eq!(user.is_speaking, None);
    }

    /// Accepts one HTTP request, answers with `body`, and reports the request line.
    async fn respond_once(body: &'static str) -> (RobotConfig, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            request.lines().next().unwrap_or_default().to_string()
        });
        let config = RobotConfig::default().with_host("127.0.0.1").with_port(port);
        (config, server)
    }

    #[tokio::test]
    async fn speak_rejected_by_robot_is_error() {
        let (config, server) =
            respond_once(r#"{"success": false, "message": "voice not loaded"}"#).await;
        let client = FurhatClient::new(&config).unwrap();

        let err = client.speak("Hello", true).await.unwrap_err();
        assert_eq!(err.operation, "speak");
        assert!(err.to_string().contains("voice not loaded"));
        assert!(server.await.unwrap().starts_with("POST /furhat/say?"));
    }

    #[tokio::test]
    async fn speak_accepted_by_robot_is_ok() {
        let (config, _server) = respond_once(r#"{"success": true, "message": ""}"#).await;
        let client = FurhatClient::new(&config).unwrap();

        assert!(client.speak("Hello", true).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn rest_listen_outlasts_short_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accepts and never answers, like a robot still listening.
        let _server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
        });
        let config = RobotConfig::default().with_host("127.0.0.1").with_port(port);
        let client = FurhatClient::new(&config).unwrap();

        let started = tokio::time::Instant::now();
        let result = client.listen(Some(Duration::from_secs(5))).await;

        assert!(result.is_err());
        assert!(started.elapsed() >= LISTEN_LIMIT);
    }

    #[test]
    fn realtime_listener_follows_config() {
        let client = FurhatClient::new(&RobotConfig::default()).unwrap();
        assert!(client.realtime.is_none());

        let config = RobotConfig::default().with_realtime_port(9000);
        let client = FurhatClient::new(&config).unwrap();
        assert_eq!(
            client.realtime.as_ref().map(FurhatRealtime::url),
            Some("ws://localhost:9000/v1/events")
        );
    }

    #[test]
    fn status_tolerates_missing_fields() {
        let status: FurhatStatus = serde_json::from_str("{}").unwrap();
        assert!(!status.success);
        assert!(status.message.is_empty());
    }
}
