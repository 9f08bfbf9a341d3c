//! OpenAI-compatible chat-completions client
//!
//! Serves both backends (Groq exposes the same API under its own base URL).
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use super::{BackendFailure, BackendId, CompletionBackend, CompletionRequest};
use crate::error::AssistantError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Reusable client (connection-pooled)
pub struct OpenAiCompatibleBackend {
    id: BackendId,
    client: Client,
    base_url: String,
}

impl OpenAiCompatibleBackend {
    pub fn new(id: BackendId) -> crate::Result<Self> {
        Self::with_base_url(id, id.base_url())
    }

    pub fn with_base_url(id: BackendId, base_url: impl Into<String>) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            id,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn dispatch(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, BackendFailure> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = build_request(request);

        info!(provider = %self.id, model = %request.model, "Calling completion backend");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.id, "Completion request failed: {}", e);
                let failure = BackendFailure::new(format!("request failed: {}", e));
                match e.status() {
                    Some(status) => failure.with_status(status.as_u16()),
                    None => failure,
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(provider = %self.id, status = %status, "Completion response body unreadable: {}", e);
            let failure = BackendFailure::new(format!("response body unreadable: {}", e));
            if status.is_success() {
                failure
            } else {
                failure.with_status(status.as_u16())
            }
        })?;

        if !status.is_success() {
            error!(provider = %self.id, status = %status, "Completion backend error response: {}", text);
            return Err(failure_from_body(status.as_u16(), &text));
        }

        parse_completion(&text)
    }
}

fn build_request(request: &CompletionRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &request.system_prompt,
            },
            ChatMessage {
                role: "user",
                content: &request.prompt,
            },
        ],
        temperature: 0.3,
    }
}

fn parse_completion(body: &str) -> std::result::Result<String, BackendFailure> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        error!("Failed to parse completion response: {}", e);
        BackendFailure::new(format!("completion parse error: {}", e))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| BackendFailure::new("empty response from completion backend"))
}

/// Decode `{"error": {"message", "code", "type"}}`, falling back to the raw body
fn failure_from_body(status: u16, body: &str) -> BackendFailure {
    let failure = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = envelope.error.code.or(envelope.error.kind);
            let failure = BackendFailure::new(envelope.error.message);
            match code {
                Some(code) => failure.with_code(code),
                None => failure,
            }
        }
        Err(_) if body.trim().is_empty() => BackendFailure::new("empty error body"),
        Err(_) => BackendFailure::new(body.trim()),
    };
    failure.with_status(status)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::provider::classify_failure;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "llama-3.3-70b-versatile".into(),
            api_key: "gsk".into(),
            system_prompt: "You are a banking assistant".into(),
            prompt: "User: What is APR?".into(),
        }
    }

    #[test]
    fn test_request_serialization() {
        let req = request();
        let json = serde_json::to_value(build_request(&req)).unwrap();

        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "User: What is APR?");
        assert!(json.to_string().find("gsk").is_none());
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"APR is the yearly cost of credit."}}]}"#;
        assert_eq!(
            parse_completion(body).unwrap(),
            "APR is the yearly cost of credit."
        );
    }

    #[test]
    fn test_empty_choices_is_failure() {
        assert!(parse_completion(r#"{"choices":[]}"#).is_err());
        assert!(parse_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#).is_err());
        assert!(parse_completion("not json").is_err());
    }

    #[test]
    fn test_quota_error_body() {
        let body = r#"{"error":{"message":"You exceeded your current quota","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        let failure = failure_from_body(429, body);

        assert_eq!(failure.status, Some(429));
        assert_eq!(failure.code.as_deref(), Some("insufficient_quota"));
        assert_eq!(classify_failure(&failure), ErrorCode::InsufficientQuota);
    }

    #[test]
    fn test_unstructured_error_body() {
        let failure = failure_from_body(502, "<html>Bad Gateway</html>");
        assert_eq!(failure.status, Some(502));
        assert_eq!(failure.code, None);
        assert_eq!(classify_failure(&failure), ErrorCode::AiFailed);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend =
            OpenAiCompatibleBackend::with_base_url(BackendId::Groq, "http://localhost:9/v1/").unwrap();
        assert_eq!(backend.base_url, "http://localhost:9/v1");
        assert_eq!(backend.id(), BackendId::Groq);
    }

    /// Serves one response that promises more body than it sends
    async fn truncated_body_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the whole request so the client is waiting on the response
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_lowercase();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if received.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }

            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"choi")
                .await
                .unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}/v1", addr)
    }

    #[tokio::test]
    async fn test_truncated_body_is_reported_not_swallowed() {
        let base_url = truncated_body_server().await;
        let backend = OpenAiCompatibleBackend::with_base_url(BackendId::Groq, base_url).unwrap();

        let failure = backend.dispatch(&request()).await.unwrap_err();

        assert!(failure.message.starts_with("response body unreadable:"));
        assert_eq!(failure.status, None);
        assert_eq!(classify_failure(&failure), ErrorCode::AiFailed);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_generic_failure() {
        // Port 9 (discard) is closed on test machines
        let backend =
            OpenAiCompatibleBackend::with_base_url(BackendId::OpenAi, "http://127.0.0.1:9/v1").unwrap();
        let failure = backend.dispatch(&request()).await.unwrap_err();
        assert_eq!(classify_failure(&failure), ErrorCode::AiFailed);
    }
}
