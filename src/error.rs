//! Error types for the banking persona assistant

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::BackendId;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Machine-readable error codes surfaced to the UI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotConfigured,
    InsufficientQuota,
    AiFailed,
    StorageFailed,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotConfigured => "not_configured",
            ErrorCode::InsufficientQuota => "insufficient_quota",
            ErrorCode::AiFailed => "ai_failed",
            ErrorCode::StorageFailed => "storage_failed",
            ErrorCode::Cancelled => "cancelled",
        }
    }

    /// HTTP-like status the caller should use for this code
    pub fn status(&self) -> u16 {
        match self {
            ErrorCode::NotConfigured => 400,
            ErrorCode::InsufficientQuota => 429,
            ErrorCode::AiFailed | ErrorCode::StorageFailed => 500,
            // Client closed request
            ErrorCode::Cancelled => 499,
        }
    }
}

#[derive(Error, Debug)]
pub enum AssistantError {

    // =============================
    // Backend / Provider Errors
    // =============================

    #[error("{0}")]
    NotConfigured(String),

    #[error("Quota exceeded")]
    InsufficientQuota { provider: BackendId, model: String },

    #[error("AI failed: {detail}")]
    AiFailed {
        provider: BackendId,
        model: String,
        detail: String,
    },

    // =============================
    // Persona Storage Errors
    // =============================

    #[error("Persona storage error: {0}")]
    Storage(String),

    // =============================
    // Turn Lifecycle
    // =============================

    #[error("Turn cancelled by caller")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AssistantError::NotConfigured(_) | AssistantError::Config(_) => ErrorCode::NotConfigured,
            AssistantError::InsufficientQuota { .. } => ErrorCode::InsufficientQuota,
            AssistantError::AiFailed { .. } => ErrorCode::AiFailed,
            AssistantError::Storage(_) => ErrorCode::StorageFailed,
            AssistantError::Cancelled => ErrorCode::Cancelled,
        }
    }

    pub fn status(&self) -> u16 {
        self.code().status()
    }

    /// Error body surfaced to the caller
    pub fn to_response(&self) -> ErrorResponse {
        let (provider, model) = match self {
            AssistantError::InsufficientQuota { provider, model }
            | AssistantError::AiFailed { provider, model, .. } => {
                (Some(provider.as_str().to_string()), Some(model.clone()))
            }
            _ => (None, None),
        };

        // The UI shows these two verbatim; upstream detail stays in the logs.
        let error = match self {
            AssistantError::AiFailed { .. } => "AI failed".to_string(),
            other => other.to_string(),
        };

        ErrorResponse {
            error,
            code: self.code(),
            provider,
            model,
        }
    }
}

/// `{error, code, provider?, model?}` body returned alongside the status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ErrorResponse {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AssistantError::NotConfigured("x".into()).status(), 400);
        assert_eq!(
            AssistantError::InsufficientQuota {
                provider: BackendId::Groq,
                model: "m".into()
            }
            .status(),
            429
        );
        assert_eq!(AssistantError::Storage("disk".into()).status(), 500);
        assert_eq!(AssistantError::Cancelled.status(), 499);
    }

    #[test]
    fn test_ai_failed_response_hides_detail() {
        let err = AssistantError::AiFailed {
            provider: BackendId::OpenAi,
            model: "gpt-4o-mini".into(),
            detail: "upstream 502: bad gateway".into(),
        };

        let body = err.to_response();
        assert_eq!(body.error, "AI failed");
        assert_eq!(body.code, ErrorCode::AiFailed);
        assert_eq!(body.provider.as_deref(), Some("openai"));
        assert_eq!(body.model.as_deref(), Some("gpt-4o-mini"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "ai_failed");
    }

    #[test]
    fn test_not_configured_body_omits_model() {
        let body = AssistantError::NotConfigured(
            "Neither GROQ_API_KEY nor OPENAI_API_KEY found".into(),
        )
        .to_response();

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "not_configured");
        assert!(json.get("model").is_none());
    }
}
