//! Core data models for the banking persona assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::agent::TurnStage;
use crate::error::ErrorResponse;

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Utterance {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

//
// ================= Signals =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Euphoric,
    Positive,
    Neutral,
    Concerned,
    Stressed,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Euphoric => "euphoric",
            EmotionLabel::Positive => "positive",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Concerned => "concerned",
            EmotionLabel::Stressed => "stressed",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotional valence/intensity of a single utterance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignalResult {
    pub label: EmotionLabel,
    /// Always within -5..=5
    pub score: i8,
    /// Always within 1..=3
    pub intensity: u8,
}

//
// ================= Risk =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub message: String,
}

//
// ================= Persona =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersonaStatus {
    Active,
    Learning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskAffinity {
    Conservative,
    Moderate,
    Balanced,
    Growth,
}

impl fmt::Display for PersonaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PersonaStatus::Active => "active",
            PersonaStatus::Learning => "learning",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RiskAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskAffinity::Conservative => "conservative",
            RiskAffinity::Moderate => "moderate",
            RiskAffinity::Balanced => "balanced",
            RiskAffinity::Growth => "growth",
        };
        write!(f, "{}", s)
    }
}

/// Durable per-session preference record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub status: PersonaStatus,
    pub risk_affinity: RiskAffinity,
    pub tone_preference: String,
    pub contact_channels: BTreeSet<String>,
    pub goals: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//
// ================= Financial Context =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpend {
    pub category: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Read-only snapshot supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    #[serde(default)]
    pub total_income: Option<f64>,
    #[serde(default)]
    pub total_expenses: Option<f64>,
    #[serde(default)]
    pub net_worth: Option<f64>,
    #[serde(default)]
    pub top_categories: Vec<CategorySpend>,
}

//
// ================= Turn Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    pub text: String,
    pub provider: String,
    pub model: String,
    /// Session the persona was read from and saved under
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_info: Option<RiskAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona_snapshot: Option<Persona>,
    /// Echo of the forced-provider setting when debug is on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Persona read/write failure; the reply itself is still valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<ErrorResponse>,
    pub trace: Vec<TurnStage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_timestamp_defaults() {
        let u: Utterance =
            serde_json::from_str(r#"{"role":"user","content":"hello"}"#).unwrap();
        assert_eq!(u.role, Role::User);
        assert_eq!(u.content, "hello");
    }

    #[test]
    fn test_financial_summary_wire_format() {
        let summary: FinancialSummary = serde_json::from_str(
            r#"{"totalIncome":85000,"netWorth":12000.5,"topCategories":[{"category":"Food","amount":9000}]}"#,
        )
        .unwrap();

        assert_eq!(summary.total_income, Some(85000.0));
        assert_eq!(summary.total_expenses, None);
        assert_eq!(summary.top_categories[0].category, "Food");
    }
}
