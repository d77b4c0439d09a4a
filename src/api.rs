//! HTTP client for the assistant's `/api/chat` endpoint.

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::Turn;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with its JSON envelope and `success: false`.
    #[error("backend reported failure: {}", message.as_deref().unwrap_or("no detail"))]
    Backend { message: Option<String> },
    /// Non-2xx status with a body that is not the JSON envelope.
    #[error("server returned {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response envelope is missing the reply text")]
    MissingResponse,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [Turn],
}

/// Response envelope. The server also echoes a `history` field; it is ignored
/// because the client owns the conversation history.
#[derive(Deserialize)]
struct ChatResponse {
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one message plus the full prior conversation and return the reply
    /// text. The backend pairs `success: false` envelopes with 4xx/5xx
    /// statuses, so the envelope is parsed before the status is given up on.
    pub async fn send_message(&self, message: &str, history: &[Turn]) -> Result<String, ApiError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("POST {} ({} prior turns)", url, history.len());

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message, history })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope: ChatResponse = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(err) if !status.is_success() => {
                warn!("non-JSON error body from server (status {status}): {err}");
                return Err(ApiError::Status(status));
            }
            Err(err) => return Err(ApiError::Decode(err)),
        };

        if !envelope.success {
            return Err(ApiError::Backend {
                message: envelope.error,
            });
        }
        if !status.is_success() {
            // A success envelope on an error status is not trustworthy.
            return Err(ApiError::Status(status));
        }
        envelope.response.ok_or(ApiError::MissingResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Sender;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_successful_exchange_returns_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({
                "message": "hola",
                "history": [{"sender": "Usuario", "text": "hi"}, {"sender": "Bot", "text": "hey"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "response": "**hola**",
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let history = vec![
            Turn {
                sender: Sender::User,
                text: "hi".to_string(),
            },
            Turn {
                sender: Sender::Bot,
                text: "hey".to_string(),
            },
        ];
        let reply = client.send_message("hola", &history).await.unwrap();
        assert_eq!(reply, "**hola**");
    }

    #[tokio::test]
    async fn test_failure_envelope_becomes_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "error": "Error al procesar tu consulta.",
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let err = client.send_message("hola", &[]).await.unwrap_err();
        match err {
            ApiError::Backend { message } => {
                assert_eq!(message.as_deref(), Some("Error al procesar tu consulta."));
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_envelope_without_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let err = client.send_message("hola", &[]).await.unwrap_err();
        match err {
            ApiError::Backend { message } => assert!(message.is_none()),
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_becomes_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let err = client.send_message("hola", &[]).await.unwrap_err();
        match err {
            ApiError::Status(status) => assert_eq!(status.as_u16(), 502),
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_becomes_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let err = client.send_message("hola", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_success_without_reply_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let err = client.send_message("hola", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingResponse));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 is the discard port; nothing is listening there.
        let client = ChatClient::new("http://127.0.0.1:9");
        let err = client.send_message("hola", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
