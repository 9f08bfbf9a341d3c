//! Persona Store
//!
//! A small durable record per session that evolves from conversational
//! signals. The orchestrator only talks to the `PersonaStore` trait; the
//! backing medium is chosen at startup.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryPersonaStore;
pub use postgres::PgPersonaStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{EmotionLabel, Persona, PersonaStatus, RiskAffinity, SignalResult};
use crate::Result;

const DEFAULT_NAME: &str = "You";
const DEFAULT_SUMMARY: &str = "Persona created from conversation. Evolves with your interactions to personalize guidance and channel choices.";
const DEFAULT_CHANNELS: &[&str] = &["app push", "email"];
const DEFAULT_GOALS: &[&str] = &[
    "responsible finance",
    "avoid impulsive debt",
    "optimize cashflow",
];

/// Trait for persona persistence
#[async_trait]
pub trait PersonaStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Persona>>;

    /// Insert or replace by id. `updated_at` never moves backwards.
    async fn save(&self, persona: &Persona) -> Result<()>;

    async fn get_or_create_session_id(&self) -> Result<String>;
}

impl Persona {
    /// First persona of a session, seeded from the opening turn's signal
    pub fn from_signal(id: impl Into<String>, signal: &SignalResult, now: DateTime<Utc>) -> Self {
        let risk_affinity = match signal.label {
            EmotionLabel::Euphoric => RiskAffinity::Conservative,
            EmotionLabel::Stressed => RiskAffinity::Moderate,
            _ => RiskAffinity::Balanced,
        };

        Self {
            id: id.into(),
            name: DEFAULT_NAME.to_string(),
            summary: DEFAULT_SUMMARY.to_string(),
            status: PersonaStatus::Active,
            risk_affinity,
            tone_preference: signal.label.as_str().to_string(),
            contact_channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>(),
            goals: DEFAULT_GOALS.iter().map(|g| g.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a turn's signal into the record
    pub fn absorb_signal(&mut self, signal: &SignalResult, now: DateTime<Utc>) {
        self.tone_preference = signal.label.as_str().to_string();
        self.updated_at = self.updated_at.max(now);
    }
}

/// Postgres when a database URL is configured, in-memory otherwise
pub fn build_store(database_url: Option<&str>) -> Arc<dyn PersonaStore> {
    if let Some(url) = database_url {
        match PgPersonaStore::connect_lazy(url) {
            Ok(store) => {
                info!("Persona store backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres persona store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Persona store backend: in-memory");
    Arc::new(InMemoryPersonaStore::new())
}

/// Fresh `local-<uuid>` id for a session that arrived without one
pub(crate) fn new_session_id() -> String {
    format!("local-{}", uuid::Uuid::new_v4())
}
