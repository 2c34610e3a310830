use crate::models::chat::{ ChatMessage, ChatRequest, ErrorBody, Sender, SessionId };
use log::{ debug, error };
use reqwest::Client as HttpClient;
use serde_json::Value as JsonValue;
use std::error::Error;
use std::time::Duration;
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };

const FALLBACK_ERROR: &str = "Sorry, failed to get a response. Please try again.";
const UNEXPECTED_REPLY: &str = "Received an unexpected response from the server.";

/// Client-side chat transcript. At most one exchange is in flight at a time.
#[derive(Debug, Clone)]
pub struct ChatWidget {
    session_id: SessionId,
    messages: Vec<ChatMessage>,
    pending: bool,
    error: Option<String>,
    open: bool,
    next_id: u64,
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new(SessionId::generate())
    }
}

impl ChatWidget {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            pending: false,
            error: None,
            open: false,
            next_id: 1,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
        if self.open {
            self.error = None;
        }
    }

    fn push(&mut self, sender: Sender, text: String) {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage { id, sender, text });
    }

    /// Records the user's turn and returns the request to submit, or `None` when the
    /// input is blank or a reply is still pending.
    pub fn begin_send(&mut self, input: &str) -> Option<ChatRequest> {
        let text = input.trim();
        if text.is_empty() || self.pending {
            return None;
        }
        self.push(Sender::User, text.to_string());
        self.pending = true;
        self.error = None;
        Some(ChatRequest {
            message: text.to_string(),
            session_id: self.session_id.to_string(),
        })
    }

    /// Settles the in-flight exchange. Errors are kept for display, not retried.
    pub fn finish(&mut self, result: Result<String, String>) {
        match result {
            Ok(reply) => self.push(Sender::Ai, reply),
            Err(e) => self.error = Some(e),
        }
        self.pending = false;
    }
}

/// Talks to a dashboard's `POST /api/chat`.
pub struct ChatRelayClient {
    http: HttpClient,
    endpoint: String,
}

impl ChatRelayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: HttpClient::builder().timeout(timeout).build()?,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        })
    }

    /// Sends one turn; errors come back as text fit for the transcript.
    pub async fn send(&self, request: &ChatRequest) -> Result<String, String> {
        debug!("Calling {} (session: {})", self.endpoint, request.session_id);
        let resp = self.http.post(&self.endpoint).json(request).send().await.map_err(|e| {
            error!("Failed to send chat message: {}", e);
            FALLBACK_ERROR.to_string()
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            error!("Failed to read chat response: {}", e);
            FALLBACK_ERROR.to_string()
        })?;

        if !status.is_success() {
            return Err(
                serde_json::from_str::<ErrorBody>(&body)
                    .map(|b| b.error)
                    .unwrap_or_else(|_| format!("Error: {}", status))
            );
        }

        serde_json::from_str::<JsonValue>(&body)
            .ok()
            .and_then(|v| v.get("reply").and_then(|r| r.as_str()).map(str::to_string))
            .ok_or_else(|| {
                error!("Invalid success response from chat endpoint: {}", body);
                UNEXPECTED_REPLY.to_string()
            })
    }
}

/// Line-oriented chat against a running dashboard until EOF or `/quit`.
pub async fn run_terminal_chat(base_url: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let client = ChatRelayClient::new(base_url, Duration::from_secs(60))?;
    let mut widget = ChatWidget::default();
    widget.toggle();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(format!("Session {} - type /quit to leave\n> ", widget.session_id()).as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        if let Some(request) = widget.begin_send(&line) {
            stdout.write_all(b"Thinking...\n").await?;
            stdout.flush().await?;
            let result = client.send(&request).await;
            widget.finish(result);
            let out = match (widget.error(), widget.messages().last()) {
                (Some(e), _) => format!("[error] {}\n", e),
                (None, Some(msg)) => format!("AI: {}\n", msg.text),
                (None, None) => String::new(),
            };
            stdout.write_all(out.as_bytes()).await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }
    Ok(())
}
