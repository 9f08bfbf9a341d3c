//! Completion backends
//!
//! The orchestrator only depends on `CompletionBackend::dispatch`, looked up
//! by `BackendId` in a `BackendRegistry`. Which backend to use is decided per
//! request by the `ProviderResolver`.

pub mod openai;
pub mod resolver;

pub use openai::OpenAiCompatibleBackend;
pub use resolver::{ProviderResolver, ProviderSelection, ProviderStatus, ResolveError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ErrorCode;

/// Known completion backends. OpenAI is primary, Groq secondary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    OpenAi,
    Groq,
}

impl BackendId {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Some(BackendId::OpenAi),
            "groq" => Some(BackendId::Groq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::OpenAi => "openai",
            BackendId::Groq => "groq",
        }
    }

    pub fn other(&self) -> BackendId {
        match self {
            BackendId::OpenAi => BackendId::Groq,
            BackendId::Groq => BackendId::OpenAi,
        }
    }

    pub fn credential_var(&self) -> &'static str {
        match self {
            BackendId::OpenAi => "OPENAI_API_KEY",
            BackendId::Groq => "GROQ_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            BackendId::OpenAi => "gpt-4o-mini",
            BackendId::Groq => "llama-3.3-70b-versatile",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            BackendId::OpenAi => "https://api.openai.com/v1",
            BackendId::Groq => "https://api.groq.com/openai/v1",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completion call
#[derive(Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub api_key: String,
    pub system_prompt: String,
    pub prompt: String,
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

/// Raw transport failure reported by an adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl BackendFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.code) {
            (Some(status), Some(code)) => write!(f, "{} ({}): {}", status, code, self.message),
            (Some(status), None) => write!(f, "{}: {}", status, self.message),
            (None, Some(code)) => write!(f, "({}): {}", code, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Map a transport failure to the caller-facing error kind.
///
/// Quota/rate limits are retryable by the caller; everything else is opaque.
pub fn classify_failure(failure: &BackendFailure) -> ErrorCode {
    let quota = failure.status == Some(429)
        || failure.code.as_deref() == Some("insufficient_quota")
        || failure.message.to_lowercase().contains("quota");

    if quota {
        ErrorCode::InsufficientQuota
    } else {
        ErrorCode::AiFailed
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn id(&self) -> BackendId;

    async fn dispatch(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<String, BackendFailure>;
}

/// Backend adapters indexed by id
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendId, Arc<dyn CompletionBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP adapters for every known backend
    pub fn http() -> crate::Result<Self> {
        let mut registry = Self::new();
        for id in [BackendId::OpenAi, BackendId::Groq] {
            registry.register(Arc::new(OpenAiCompatibleBackend::new(id)?));
        }
        Ok(registry)
    }

    pub fn register(&mut self, backend: Arc<dyn CompletionBackend>) {
        self.backends.insert(backend.id(), backend);
    }

    pub fn get(&self, id: BackendId) -> Option<Arc<dyn CompletionBackend>> {
        self.backends.get(&id).cloned()
    }

    pub fn list(&self) -> Vec<BackendId> {
        self.backends.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_id_wire_names() {
        assert_eq!(serde_json::to_string(&BackendId::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&BackendId::Groq).unwrap(), "\"groq\"");
        assert_eq!(BackendId::parse("OpenAI"), Some(BackendId::OpenAi));
        assert_eq!(BackendId::Groq.other(), BackendId::OpenAi);
    }

    #[test]
    fn test_quota_classification() {
        let by_status = BackendFailure::new("Too Many Requests").with_status(429);
        let by_code = BackendFailure::new("billing").with_code("insufficient_quota");
        let by_message = BackendFailure::new("You exceeded your current QUOTA");

        for failure in [by_status, by_code, by_message] {
            assert_eq!(classify_failure(&failure), ErrorCode::InsufficientQuota);
        }
    }

    #[test]
    fn test_generic_failures() {
        let cases = [
            BackendFailure::new("connection reset"),
            BackendFailure::new("Bad gateway").with_status(502),
            BackendFailure::new("invalid key").with_status(401).with_code("invalid_api_key"),
        ];

        for failure in cases {
            assert_eq!(classify_failure(&failure), ErrorCode::AiFailed);
        }
    }

    #[test]
    fn test_request_debug_hides_key() {
        let request = CompletionRequest {
            model: "m".into(),
            api_key: "sk-secret".into(),
            system_prompt: "s".into(),
            prompt: "p".into(),
        };
        assert!(!format!("{:?}", request).contains("sk-secret"));
    }

    #[test]
    fn test_http_registry_covers_all_backends() {
        let registry = BackendRegistry::http().unwrap();
        assert!(registry.get(BackendId::OpenAi).is_some());
        assert!(registry.get(BackendId::Groq).is_some());
        assert_eq!(registry.list().len(), 2);
    }
}
