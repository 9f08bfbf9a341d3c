//! Impulsive-risk assessment
//!
//! Rules-based tiering of a turn from its text and signal.
//! Deterministic; drives the risk directive in the system prompt.

use crate::models::{EmotionLabel, RiskAssessment, RiskLevel, SignalResult};
use tracing::debug;

const IMPULSE_CUES: &[&str] = &[
    "buy now",
    "right now",
    "all in",
    "all-in",
    "yolo",
    "max out",
    "maxed out",
    "cash advance",
    "borrow",
    "gamble",
    "bet ",
    "quick money",
    "double my",
    "can't wait",
    "cant wait",
    "impulse",
    "splurge",
];

const HIGH_RISK_MESSAGE: &str = "High impulsive-risk signals detected. Consider a 24-hour cooling-off period and go through the checklist (budget impact, repayment plan, alternatives) before committing to any purchase, loan, or investment.";
const MEDIUM_RISK_MESSAGE: &str =
    "Some risk signals detected. Take a moment to double-check affordability before acting.";
const LOW_RISK_MESSAGE: &str = "No impulsive-risk signals detected.";

pub struct RiskAssessor {
    impulse_cues: Vec<String>,
}

impl RiskAssessor {
    pub fn new() -> Self {
        Self::with_cues(IMPULSE_CUES.iter().map(|c| c.to_string()).collect())
    }

    /// Cues must be lower-case
    pub fn with_cues(impulse_cues: Vec<String>) -> Self {
        Self { impulse_cues }
    }

    pub fn assess(&self, text: &str, signal: &SignalResult) -> RiskAssessment {
        let lowered = text.to_lowercase();
        let impulse = self
            .impulse_cues
            .iter()
            .any(|cue| lowered.contains(cue.as_str()));

        let heightened = matches!(
            signal.label,
            EmotionLabel::Euphoric | EmotionLabel::Stressed
        );

        let level = if impulse && (heightened || signal.intensity >= 3) {
            RiskLevel::High
        } else if impulse || heightened {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        debug!(?level, impulse, label = %signal.label, "Risk assessed");

        RiskAssessment {
            level,
            message: message_for(level).to_string(),
        }
    }
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new()
    }
}

fn message_for(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => HIGH_RISK_MESSAGE,
        RiskLevel::Medium => MEDIUM_RISK_MESSAGE,
        RiskLevel::Low => LOW_RISK_MESSAGE,
    }
}
