//! Banking Persona Assistant
//!
//! The message-handling core of a banking chat assistant:
//! - Picks a completion backend per request, with fallback
//! - Scores each utterance for emotion and impulsive risk
//! - Refuses out-of-domain requests before any backend call
//! - Answers from a FAQ corpus when running offline
//! - Keeps a small persona record that evolves across turns
//!
//! TURN LOOP:
//! GATING → SIGNALING → DISPATCH → {BACKEND_CALL | OFFLINE_FALLBACK} → PERSONA_UPDATE → DONE

pub mod agent;
pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod faq;
pub mod guard;
pub mod models;
pub mod persona;
pub mod provider;
pub mod risk;
pub mod signals;

pub use error::{AssistantError, ErrorCode, Result};

// Re-export common types
pub use agent::{AssistantProfile, ChatOrchestrator, TurnRequest, TurnStage};
pub use models::*;
