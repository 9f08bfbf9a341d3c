//! Chat orchestrator - one conversational turn
//!
//! GATING → SIGNALING → DISPATCH → {BACKEND_CALL | OFFLINE_FALLBACK}
//!        → PERSONA_UPDATE → DONE

pub mod prompt;

pub use prompt::{AssistantProfile, PromptContext};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{OfflineMode, ProviderConfig, ProviderConfigSource};
use crate::conversation::Conversation;
use crate::error::{AssistantError, ErrorCode, ErrorResponse};
use crate::faq::FaqRetriever;
use crate::models::{FinancialSummary, Persona, RiskLevel, SignalResult, TurnReply};
use crate::persona::{new_session_id, PersonaStore};
use crate::provider::{
    classify_failure, BackendRegistry, CompletionRequest, ProviderResolver, ProviderSelection,
    ProviderStatus,
};
use crate::risk::RiskAssessor;
use crate::signals::SignalExtractor;
use crate::Result;

const GUARD_PROVIDER: &str = "guard";
const GUARD_MODEL: &str = "scope-refusal";
const OFFLINE_PROVIDER: &str = "offline";
const OFFLINE_MODEL: &str = "Banking FAQ mode";

/// Stages a turn passed through, in order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnStage {
    Gating,
    Signaling,
    Dispatch,
    BackendCall,
    OfflineFallback,
    PersonaUpdate,
    Done,
}

/// Input for one turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    #[serde(alias = "messages")]
    pub conversation: Conversation,
    #[serde(default)]
    pub persona: Option<Persona>,
    #[serde(default)]
    pub financial_summary: Option<FinancialSummary>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl TurnRequest {
    pub fn new(conversation: impl Into<Conversation>) -> Self {
        Self {
            conversation: conversation.into(),
            ..Self::default()
        }
    }
}

struct Drafted {
    text: String,
    provider: String,
    model: String,
}

impl Drafted {
    fn new(text: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model: model.into(),
        }
    }
}

pub struct ChatOrchestrator {
    config_source: Arc<dyn ProviderConfigSource>,
    backends: BackendRegistry,
    personas: Arc<dyn PersonaStore>,
    faq: Arc<FaqRetriever>,
    resolver: ProviderResolver,
    signals: SignalExtractor,
    risk: RiskAssessor,
    profile: AssistantProfile,
    offline_mode: OfflineMode,
}

impl ChatOrchestrator {
    pub fn new(
        config_source: Arc<dyn ProviderConfigSource>,
        backends: BackendRegistry,
        personas: Arc<dyn PersonaStore>,
        faq: Arc<FaqRetriever>,
    ) -> Self {
        Self {
            config_source,
            backends,
            personas,
            faq,
            resolver: ProviderResolver::new(),
            signals: SignalExtractor::new(),
            risk: RiskAssessor::new(),
            profile: AssistantProfile::default(),
            offline_mode: OfflineMode::default(),
        }
    }

    pub fn with_profile(mut self, profile: AssistantProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_offline_mode(mut self, mode: OfflineMode) -> Self {
        self.offline_mode = mode;
        self
    }

    /// What the resolver would pick right now; no side effects
    pub fn provider_status(&self) -> ProviderStatus {
        self.resolver.status(&self.config_source.load())
    }

    /// Error body for the caller. `not_configured` carries the forced provider.
    pub fn error_response(&self, error: &AssistantError) -> ErrorResponse {
        let response = error.to_response();
        if error.code() == ErrorCode::NotConfigured && response.provider.is_none() {
            return response.with_provider(self.config_source.load().forced.as_str());
        }
        response
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnReply> {
        self.handle_turn_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Run one turn. Cancelling `cancel` during the backend call discards
    /// the turn and leaves the persona untouched.
    pub async fn handle_turn_cancellable(
        &self,
        request: TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnReply> {
        let mut trace = Vec::new();
        let text = request
            .conversation
            .last_user()
            .map(|u| u.content.clone())
            .unwrap_or_default();

        // === GATING ===
        // The FAQ's gate also scopes offline answers
        trace.push(TurnStage::Gating);
        let in_scope = !self.profile.gate_enabled || self.faq.gate().allows(&text);

        // === SIGNALING ===
        trace.push(TurnStage::Signaling);
        let signal = self.signals.analyze(&text);
        let risk = self.risk.assess(&text, &signal);
        debug!(
            label = %signal.label,
            score = signal.score,
            intensity = signal.intensity,
            risk = ?risk.level,
            "Turn signals computed"
        );

        // Anonymous turns get their own session
        let session_id = request
            .session_id
            .clone()
            .or_else(|| request.persona.as_ref().map(|p| p.id.clone()))
            .unwrap_or_else(new_session_id);

        let (existing, load_error) = match &request.persona {
            Some(persona) => (Some(persona.clone()), None),
            None => match self.personas.get(&session_id).await {
                Ok(stored) => (stored, None),
                Err(e) => {
                    warn!(session_id = %session_id, "Persona load failed: {}", e);
                    (None, Some(e))
                }
            },
        };

        let config = self.config_source.load();

        let drafted = if in_scope {
            // === DISPATCH ===
            trace.push(TurnStage::Dispatch);
            let context = PromptContext {
                profile: &self.profile,
                risk: risk.level,
                persona: existing.as_ref(),
                financial_summary: request.financial_summary.as_ref(),
                conversation: &request.conversation,
            };
            self.dispatch(&context, &config, &text, &mut trace, cancel)
                .await?
        } else {
            info!("Out-of-scope turn refused");
            Drafted::new(&self.profile.refusal_message, GUARD_PROVIDER, GUARD_MODEL)
        };

        // === PERSONA UPDATE ===
        // A failed load skips the save so a stored record is never clobbered
        trace.push(TurnStage::PersonaUpdate);
        let (persona_snapshot, storage_error) = match load_error {
            Some(e) => (None, Some(e.to_response())),
            None => match self.update_persona(&session_id, existing, &signal).await {
                Ok(persona) => (Some(persona), None),
                Err(e) => {
                    warn!(session_id = %session_id, "Persona update failed: {}", e);
                    (None, Some(e.to_response()))
                }
            },
        };

        trace.push(TurnStage::Done);

        Ok(TurnReply {
            text: drafted.text,
            provider: drafted.provider,
            model: drafted.model,
            session_id,
            risk_info: (risk.level != RiskLevel::Low).then_some(risk),
            persona_snapshot,
            config: config.debug.then(|| config.forced.as_str().to_string()),
            storage_error,
            trace,
        })
    }

    async fn dispatch(
        &self,
        context: &PromptContext<'_>,
        config: &ProviderConfig,
        text: &str,
        trace: &mut Vec<TurnStage>,
        cancel: &CancellationToken,
    ) -> Result<Drafted> {
        if self.offline_mode == OfflineMode::Always {
            return Ok(self.offline_reply(text, trace));
        }

        let selection = match self.resolver.resolve(config) {
            Ok(selection) => selection,
            Err(e) if self.offline_mode == OfflineMode::WhenUnavailable => {
                warn!("No backend configured, answering from FAQ: {}", e);
                return Ok(self.offline_reply(text, trace));
            }
            Err(e) => return Err(e.into()),
        };

        // === BACKEND CALL ===
        trace.push(TurnStage::BackendCall);
        match self.call_backend(context, config, &selection, cancel).await {
            Ok(reply) => Ok(Drafted::new(
                reply,
                selection.backend_id.as_str(),
                selection.model_name,
            )),
            Err(AssistantError::Cancelled) => Err(AssistantError::Cancelled),
            Err(e) if self.offline_mode == OfflineMode::WhenUnavailable => {
                warn!("Backend failed, answering from FAQ: {}", e);
                Ok(self.offline_reply(text, trace))
            }
            Err(e) => Err(e),
        }
    }

    async fn call_backend(
        &self,
        context: &PromptContext<'_>,
        config: &ProviderConfig,
        selection: &ProviderSelection,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let provider = selection.backend_id;
        let model = selection.model_name.clone();

        let backend = self.backends.get(provider).ok_or_else(|| AssistantError::AiFailed {
            provider,
            model: model.clone(),
            detail: format!("no adapter registered for {}", provider),
        })?;

        let completion = CompletionRequest {
            model: model.clone(),
            api_key: config.backend(provider).api_key.clone().unwrap_or_default(),
            system_prompt: prompt::build_system_prompt(context),
            prompt: context.conversation.transcript(),
        };

        info!(
            provider = %provider,
            model = %model,
            fell_back_from = ?selection.fell_back_from,
            "Dispatching turn"
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(provider = %provider, "Turn cancelled during backend call");
                return Err(AssistantError::Cancelled);
            }
            outcome = backend.dispatch(&completion) => outcome,
        };

        outcome.map_err(|failure| match classify_failure(&failure) {
            ErrorCode::InsufficientQuota => AssistantError::InsufficientQuota { provider, model },
            _ => AssistantError::AiFailed {
                provider,
                model,
                detail: failure.to_string(),
            },
        })
    }

    fn offline_reply(&self, text: &str, trace: &mut Vec<TurnStage>) -> Drafted {
        trace.push(TurnStage::OfflineFallback);
        let answer = self
            .faq
            .find(text)
            .into_text()
            .unwrap_or_else(|| self.profile.offline_message.clone());
        Drafted::new(answer, OFFLINE_PROVIDER, OFFLINE_MODEL)
    }

    async fn update_persona(
        &self,
        session_id: &str,
        existing: Option<Persona>,
        signal: &SignalResult,
    ) -> Result<Persona> {
        let now = Utc::now();
        let persona = match existing {
            Some(mut persona) => {
                persona.absorb_signal(signal, now);
                persona
            }
            None => {
                info!(session_id = %session_id, "Creating persona for session");
                Persona::from_signal(session_id, signal, now)
            }
        };

        self.personas.save(&persona).await?;
        Ok(persona)
    }
}
