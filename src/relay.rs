use crate::models::chat::{ ChatReply, ChatRequest, ErrorBody };
use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use log::{ error, info };
use reqwest::Client as HttpClient;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

/// Failures of one chat relay exchange. `Display` is for logs; clients only see
/// [`RelayError::client_message`].
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("message is missing or blank")]
    MissingMessage,
    #[error("sessionId is missing")]
    MissingSessionId,
    #[error("webhook URL is not configured")]
    MissingWebhookUrl,
    #[error("too many chat requests")]
    RateLimited,
    #[error("webhook returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("webhook unreachable: {0}")]
    UpstreamUnreachable(String),
    #[error("webhook reply is malformed: {0}")]
    InvalidUpstreamResponse(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidJson(_)
            | RelayError::MissingMessage
            | RelayError::MissingSessionId => StatusCode::BAD_REQUEST,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::MissingWebhookUrl
            | RelayError::UpstreamUnreachable(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::UpstreamStatus { .. }
            | RelayError::InvalidUpstreamResponse(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn client_message(&self) -> &'static str {
        match self {
            RelayError::InvalidJson(_) => "Invalid JSON in request body.",
            RelayError::MissingMessage => "Message is required.",
            RelayError::MissingSessionId => "Session ID is required.",
            RelayError::MissingWebhookUrl => "Server configuration error.",
            RelayError::RateLimited => "Too many requests. Please try again shortly.",
            RelayError::UpstreamStatus { .. } => {
                "Failed to process message with backend workflow."
            }
            RelayError::InvalidUpstreamResponse(_) => {
                "Received invalid response format from backend workflow."
            }
            RelayError::UpstreamUnreachable(_) | RelayError::Internal(_) => {
                "An internal server error occurred."
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.client_message().to_string() };
        (self.status(), Json(body)).into_response()
    }
}

/// Validates a raw `POST /api/chat` body. Checks run in order: JSON, message, session.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, RelayError> {
    let value: JsonValue = serde_json::from_slice(body)
        .map_err(|e| RelayError::InvalidJson(e.to_string()))?;

    let message = value
        .get("message")
        .and_then(|v| v.as_str())
        .filter(|m| !m.trim().is_empty())
        .ok_or(RelayError::MissingMessage)?;
    let session_id = value
        .get("sessionId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(RelayError::MissingSessionId)?;

    Ok(ChatRequest {
        message: message.to_string(),
        session_id: session_id.to_string(),
    })
}

/// Extracts the string `reply` from a webhook response body.
pub fn parse_webhook_reply(body: &str) -> Result<ChatReply, RelayError> {
    let value: JsonValue = serde_json::from_str(body)
        .map_err(|e| RelayError::InvalidUpstreamResponse(format!("{}: {}", e, body)))?;
    match value.get("reply").and_then(|r| r.as_str()) {
        Some(reply) => Ok(ChatReply { reply: reply.to_string() }),
        None => Err(RelayError::InvalidUpstreamResponse(body.to_string())),
    }
}

/// Forwards chat turns to the workflow webhook. Holds no per-conversation state.
#[derive(Clone)]
pub struct WebhookClient {
    http: HttpClient,
    url: Option<String>,
}

impl WebhookClient {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut builder = HttpClient::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            url: url.filter(|u| !u.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub async fn forward(&self, request: &ChatRequest) -> Result<ChatReply, RelayError> {
        let url = self.url.as_deref().ok_or_else(|| {
            error!("N8N_WEBHOOK_URL is not set; cannot relay chat message.");
            RelayError::MissingWebhookUrl
        })?;

        info!("Relaying chat message for session {} to webhook", request.session_id);
        let resp = self.http
            .post(url)
            .json(request)
            .send().await
            .map_err(|e| {
                error!("Webhook request failed: {}", e);
                if e.is_builder() {
                    RelayError::Internal(e.to_string())
                } else {
                    RelayError::UpstreamUnreachable(e.to_string())
                }
            })?;

        let status = resp.status();
        info!("Webhook responded with status {}", status);
        let body = resp.text().await.map_err(|e| {
            error!("Failed to read webhook response body: {}", e);
            RelayError::UpstreamUnreachable(e.to_string())
        })?;

        if !status.is_success() {
            error!("Webhook failed with status {}: {}", status, body);
            return Err(RelayError::UpstreamStatus { status: status.as_u16(), body });
        }

        parse_webhook_reply(&body).map_err(|e| {
            error!("Invalid response structure from webhook: {}", body);
            e
        })
    }

    /// Full relay cycle for a raw request body.
    pub async fn relay(&self, body: &[u8]) -> Result<ChatReply, RelayError> {
        let request = parse_chat_request(body)?;
        info!("Received chat message (session: {})", request.session_id);
        self.forward(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: Option<String>) -> WebhookClient {
        WebhookClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn validation_order() {
        assert!(matches!(parse_chat_request(b"{not json"), Err(RelayError::InvalidJson(_))));
        assert!(matches!(
            parse_chat_request(br#"{"sessionId": 5}"#),
            Err(RelayError::MissingMessage)
        ));
        assert!(matches!(
            parse_chat_request(br#"{"message": "   ", "sessionId": "s1"}"#),
            Err(RelayError::MissingMessage)
        ));
        assert!(matches!(
            parse_chat_request(br#"{"message": 12, "sessionId": "s1"}"#),
            Err(RelayError::MissingMessage)
        ));
        assert!(matches!(
            parse_chat_request(br#"{"message": "hi"}"#),
            Err(RelayError::MissingSessionId)
        ));
        assert!(matches!(
            parse_chat_request(br#"{"message": "hi", "sessionId": 9}"#),
            Err(RelayError::MissingSessionId)
        ));
        assert!(matches!(parse_chat_request(b"[]"), Err(RelayError::MissingMessage)));
    }

    #[test]
    fn message_is_forwarded_untrimmed() {
        let req = parse_chat_request(br#"{"message": " hi ", "sessionId": "s1"}"#).unwrap();
        assert_eq!(req.message, " hi ");
        assert_eq!(req.session_id, "s1");
    }

    #[test]
    fn status_taxonomy() {
        assert_eq!(RelayError::MissingMessage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::MissingWebhookUrl.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            RelayError::UpstreamStatus { status: 500, body: String::new() }.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::InvalidUpstreamResponse(String::new()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(RelayError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Transport failures are not upstream replies: generic 500, not 502.
        let unreachable = RelayError::UpstreamUnreachable("connection refused".into());
        assert_eq!(unreachable.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(unreachable.client_message(), "An internal server error occurred.");
    }

    #[test]
    fn webhook_reply_must_be_string() {
        assert_eq!(parse_webhook_reply(r#"{"reply":"hi"}"#).unwrap().reply, "hi");
        assert!(parse_webhook_reply(r#"{"reply":3}"#).is_err());
        assert!(parse_webhook_reply(r#"{"output":"hi"}"#).is_err());
        assert!(parse_webhook_reply("<html>").is_err());
    }

    #[test]
    fn blank_webhook_url_counts_as_missing() {
        assert!(!client(Some("  ".into())).is_configured());
        assert!(client(Some("http://localhost/hook".into())).is_configured());
    }

    #[tokio::test]
    async fn missing_webhook_fails_before_any_call() {
        let err = client(None)
            .relay(br#"{"message": "hi", "sessionId": "s1"}"#).await
            .unwrap_err();
        assert!(matches!(err, RelayError::MissingWebhookUrl));
    }

    #[tokio::test]
    async fn forwards_message_and_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "message": "how fast was I?",
                "sessionId": "s1"
            })))
            .with_status(200)
            .with_body(r#"{"reply":"quick"}"#)
            .create_async().await;

        let reply = client(Some(format!("{}/hook", server.url())))
            .relay(br#"{"message": "how fast was I?", "sessionId": "s1"}"#).await
            .unwrap();
        assert_eq!(reply.reply, "quick");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_error_status_is_bad_gateway() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/hook").with_status(500).with_body("boom").create_async().await;

        let err = client(Some(format!("{}/hook", server.url())))
            .relay(br#"{"message": "hi", "sessionId": "s1"}"#).await
            .unwrap_err();
        assert!(matches!(err, RelayError::UpstreamStatus { status: 500, .. }));
        assert_eq!(err.client_message(), "Failed to process message with backend workflow.");
    }

    #[tokio::test]
    async fn silent_webhook_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = WebhookClient::new(
            Some(format!("http://{}/hook", addr)),
            Duration::from_secs(1)
        ).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            client.relay(br#"{"message": "hi", "sessionId": "s1"}"#)
        ).await.expect("webhook call was not bounded by its timeout");

        let err = result.unwrap_err();
        assert!(matches!(err, RelayError::UpstreamUnreachable(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        hold.abort();
    }
}
