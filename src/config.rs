//! Explicit configuration
//!
//! Core logic never reads the environment. `ProviderConfig` is handed to the
//! resolver on every request through a `ProviderConfigSource`; the env-backed
//! source re-reads variables each time so credential changes apply without a
//! restart.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use crate::error::{AssistantError, Result};
use crate::provider::BackendId;

/// Forced provider override
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreference {
    #[default]
    Auto,
    OpenAi,
    Groq,
}

impl ProviderPreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" | "" => Some(ProviderPreference::Auto),
            other => BackendId::parse(other).map(Self::from),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPreference::Auto => "auto",
            ProviderPreference::OpenAi => "openai",
            ProviderPreference::Groq => "groq",
        }
    }

    pub fn backend(&self) -> Option<BackendId> {
        match self {
            ProviderPreference::Auto => None,
            ProviderPreference::OpenAi => Some(BackendId::OpenAi),
            ProviderPreference::Groq => Some(BackendId::Groq),
        }
    }
}

impl From<BackendId> for ProviderPreference {
    fn from(id: BackendId) -> Self {
        match id {
            BackendId::OpenAi => ProviderPreference::OpenAi,
            BackendId::Groq => ProviderPreference::Groq,
        }
    }
}

impl fmt::Display for ProviderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-backend credential and model settings
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BackendSettings {
    pub api_key: Option<String>,
    /// Explicit override; beats the environment
    pub model_override: Option<String>,
    /// `OPENAI_MODEL` / `GROQ_MODEL`
    pub env_model: Option<String>,
}

impl BackendSettings {
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .map_or(false, |key| !key.trim().is_empty())
    }
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_override", &self.model_override)
            .field("env_model", &self.env_model)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub forced: ProviderPreference,
    /// Raw `AI_PROVIDER` value; unknown values count as no preference
    pub env_preference: Option<String>,
    pub openai: BackendSettings,
    pub groq: BackendSettings,
    pub debug: bool,
}

impl ProviderConfig {
    pub fn backend(&self, id: BackendId) -> &BackendSettings {
        match id {
            BackendId::OpenAi => &self.openai,
            BackendId::Groq => &self.groq,
        }
    }

    pub fn from_env() -> Self {
        Self {
            forced: env_opt("AI_FORCE_PROVIDER")
                .and_then(|v| ProviderPreference::parse(&v))
                .unwrap_or_default(),
            env_preference: env_opt("AI_PROVIDER"),
            openai: BackendSettings {
                api_key: env_opt("OPENAI_API_KEY"),
                model_override: None,
                env_model: env_opt("OPENAI_MODEL"),
            },
            groq: BackendSettings {
                api_key: env_opt("GROQ_API_KEY"),
                model_override: None,
                env_model: env_opt("GROQ_MODEL"),
            },
            debug: env_flag("AI_DEBUG"),
        }
    }
}

/// Where the resolver gets a fresh `ProviderConfig` for each request
pub trait ProviderConfigSource: Send + Sync {
    fn load(&self) -> ProviderConfig;
}

/// A fixed configuration, mainly for tests and embedding
impl ProviderConfigSource for ProviderConfig {
    fn load(&self) -> ProviderConfig {
        self.clone()
    }
}

/// Re-reads the process environment on every request
#[derive(Debug, Clone, Default)]
pub struct EnvProviderConfig {
    pub forced: Option<ProviderPreference>,
    pub openai_model: Option<String>,
    pub groq_model: Option<String>,
}

impl ProviderConfigSource for EnvProviderConfig {
    fn load(&self) -> ProviderConfig {
        let mut config = ProviderConfig::from_env();
        if let Some(forced) = self.forced {
            config.forced = forced;
        }
        config.openai.model_override = self.openai_model.clone();
        config.groq.model_override = self.groq_model.clone();
        config
    }
}

/// When the FAQ corpus stands in for a backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OfflineMode {
    /// Surface `not_configured` and backend errors to the caller
    #[default]
    Never,
    /// Fall back to the FAQ when no backend is configured or the call fails
    WhenUnavailable,
    /// Never contact a backend
    Always,
}

impl OfflineMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "never" | "off" | "false" | "" => Some(OfflineMode::Never),
            "when_unavailable" | "fallback" => Some(OfflineMode::WhenUnavailable),
            "always" | "on" | "true" => Some(OfflineMode::Always),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Strict,
    General,
}

/// Process-level settings for the binaries
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub port: u16,
    pub faq_source: String,
    pub database_url: Option<String>,
    pub offline_mode: OfflineMode,
    pub profile: ProfileKind,
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self> {
        let port = match env_opt("PORT").or_else(|| env_opt("API_PORT")) {
            Some(raw) => raw
                .parse()
                .map_err(|e| AssistantError::Config(format!("invalid port {:?}: {}", raw, e)))?,
            None => 8080,
        };

        let offline_mode = match env_opt("AI_OFFLINE_MODE") {
            Some(raw) => OfflineMode::parse(&raw).ok_or_else(|| {
                AssistantError::Config(format!("unknown AI_OFFLINE_MODE {:?}", raw))
            })?,
            None => OfflineMode::default(),
        };

        let profile = match env_opt("ASSISTANT_PROFILE").as_deref() {
            Some("general") => ProfileKind::General,
            Some("strict") | None => ProfileKind::Strict,
            Some(other) => {
                return Err(AssistantError::Config(format!(
                    "unknown ASSISTANT_PROFILE {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            port,
            faq_source: env_opt("FAQ_SOURCE").unwrap_or_else(|| "data/faq.csv".to_string()),
            database_url: env_opt("POSTGRES_URL").or_else(|| env_opt("DATABASE_URL")),
            offline_mode,
            profile,
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    matches!(
        env_opt(key).as_deref().map(str::to_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_parsing() {
        assert_eq!(ProviderPreference::parse("AUTO"), Some(ProviderPreference::Auto));
        assert_eq!(ProviderPreference::parse(" groq "), Some(ProviderPreference::Groq));
        assert_eq!(ProviderPreference::parse("openai"), Some(ProviderPreference::OpenAi));
        assert_eq!(ProviderPreference::parse("anthropic"), None);
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        assert!(!BackendSettings::with_key("   ").has_credential());
        assert!(!BackendSettings::default().has_credential());
        assert!(BackendSettings::with_key("sk-test").has_credential());
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let rendered = format!("{:?}", BackendSettings::with_key("sk-secret"));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_offline_mode_parsing() {
        assert_eq!(OfflineMode::parse("always"), Some(OfflineMode::Always));
        assert_eq!(OfflineMode::parse("fallback"), Some(OfflineMode::WhenUnavailable));
        assert_eq!(OfflineMode::parse("sometimes"), None);
    }

    #[test]
    fn test_static_source_returns_same_config() {
        let config = ProviderConfig {
            groq: BackendSettings::with_key("gsk"),
            ..ProviderConfig::default()
        };
        assert_eq!(config.load(), config);
    }
}
