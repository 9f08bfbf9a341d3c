//! Provider Resolver
//!
//! Picks the completion backend for one request. Stateless: the caller hands
//! in a fresh `ProviderConfig` each time, so credential changes take effect on
//! the next request.
//!
//! Priority:
//! 1. forced provider (anything but `auto`)
//! 2. `AI_PROVIDER` preference
//! 3. no preference: secondary (Groq), then primary (OpenAI)
//!
//! A preferred backend without a credential falls back to the other one.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::BackendId;
use crate::config::ProviderConfig;
use crate::error::{AssistantError, ErrorCode};

const DEFAULT_ORDER: [BackendId; 2] = [BackendId::Groq, BackendId::OpenAi];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSelection {
    pub backend_id: BackendId,
    pub model_name: String,
    /// Set when the preferred backend had no credential
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fell_back_from: Option<BackendId>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ResolveError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<ResolveError> for AssistantError {
    fn from(e: ResolveError) -> Self {
        AssistantError::NotConfigured(e.message)
    }
}

/// What the resolver would pick right now
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderStatus {
    pub configured: bool,
    pub provider: Option<BackendId>,
    pub model: Option<String>,
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderResolver;

impl ProviderResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        config: &ProviderConfig,
    ) -> std::result::Result<ProviderSelection, ResolveError> {
        let preferred = config.forced.backend().or_else(|| {
            config
                .env_preference
                .as_deref()
                .and_then(BackendId::parse)
        });

        let selection = match preferred {
            Some(backend) => {
                if config.backend(backend).has_credential() {
                    Some(select(config, backend, None))
                } else if config.backend(backend.other()).has_credential() {
                    Some(select(config, backend.other(), Some(backend)))
                } else {
                    None
                }
            }
            None => DEFAULT_ORDER
                .iter()
                .find(|id| config.backend(**id).has_credential())
                .map(|id| select(config, *id, None)),
        };

        match selection {
            Some(selection) => {
                debug!(
                    provider = %selection.backend_id,
                    model = %selection.model_name,
                    fell_back_from = ?selection.fell_back_from,
                    "Provider resolved"
                );
                Ok(selection)
            }
            None => {
                let first = preferred.unwrap_or(DEFAULT_ORDER[0]);
                Err(ResolveError {
                    code: ErrorCode::NotConfigured,
                    message: format!(
                        "Neither {} nor {} found",
                        first.credential_var(),
                        first.other().credential_var()
                    ),
                })
            }
        }
    }

    pub fn status(&self, config: &ProviderConfig) -> ProviderStatus {
        match self.resolve(config) {
            Ok(selection) => ProviderStatus {
                configured: true,
                provider: Some(selection.backend_id),
                model: Some(selection.model_name),
                fallback: selection.fell_back_from.map(|from| {
                    format!("Fell back from {} to {}", from, selection.backend_id)
                }),
            },
            Err(_) => ProviderStatus {
                configured: false,
                provider: None,
                model: None,
                fallback: None,
            },
        }
    }
}

fn select(
    config: &ProviderConfig,
    backend: BackendId,
    fell_back_from: Option<BackendId>,
) -> ProviderSelection {
    ProviderSelection {
        backend_id: backend,
        model_name: model_for(config, backend),
        fell_back_from,
    }
}

/// explicit override → environment override → built-in default
fn model_for(config: &ProviderConfig, backend: BackendId) -> String {
    let settings = config.backend(backend);
    settings
        .model_override
        .clone()
        .or_else(|| settings.env_model.clone())
        .unwrap_or_else(|| backend.default_model().to_string())
}
