//! System prompt composition
//!
//! Assistant copy lives in `AssistantProfile` so the strict and general
//! variants share one code path.

use crate::config::ProfileKind;
use crate::conversation::{Conversation, CONTEXT_WINDOW, RECENT_CONTEXT};
use crate::models::{FinancialSummary, Persona, RiskLevel};

const STRICT_REFUSAL: &str = "I'm PersonaForge AI, your specialized banking and financial assistant. I can only help with banking, finance, and money-related questions.

I can assist you with:
• Banking services and account management
• Financial planning and budgeting
• Investment and savings advice
• Loan and credit guidance
• BPI products and services
• Personal finance strategies

Please ask me about your financial needs, and I'll be happy to provide personalized guidance based on your profile and transaction history.";

const OFFLINE_MESSAGE: &str = "I'm PersonaForge AI, specialized in banking and financial services. I can help with:

• Banking services and accounts
• Loans and credit management
• Investment planning
• Budgeting and savings
• Insurance coverage
• Financial planning

Please ask me about your financial needs, and I'll provide personalized advice based on your profile.";

const MEDIUM_RISK_DIRECTIVE: &str =
    "CAUTION: Provide a brief safety check before financial recommendations.";

const HIGH_RISK_DIRECTIVE: &str = "IMPORTANT: The user is showing high-risk impulsive behavior. Always recommend a cooling-off period and provide a detailed checklist before any risky financial decisions.";

const CLOSING_DIRECTIVE: &str = "Always provide specific, actionable financial advice tailored to their situation. Use Philippine Peso (₱) for currency references. Be empathetic and match their communication style.";

/// Assistant identity, scope rules and fixed copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantProfile {
    pub description: Vec<String>,
    pub scope_rules: Vec<String>,
    pub refusal_message: String,
    pub offline_message: String,
    /// Whether out-of-domain turns are refused before dispatch
    pub gate_enabled: bool,
}

impl AssistantProfile {
    /// Scope-gated banking assistant
    pub fn strict() -> Self {
        Self {
            description: vec![
                "You are PersonaForge AI, a cautious, empathetic banking assistant for BPI (Bank of the Philippine Islands).".to_string(),
                "You provide personalized financial advice based on the user's profile, transaction history, and conversation context.".to_string(),
            ],
            scope_rules: vec![
                "SCOPE: Only answer questions about banking, personal finance, budgeting, savings, loans, credit, investments and insurance.".to_string(),
                "If a request falls outside that scope, politely decline and steer the user back to their financial needs.".to_string(),
            ],
            refusal_message: STRICT_REFUSAL.to_string(),
            offline_message: OFFLINE_MESSAGE.to_string(),
            gate_enabled: true,
        }
    }

    /// Generic banking persona without the domain gate
    pub fn general() -> Self {
        Self {
            description: vec![
                "You are a cautious, empathetic banking assistant for BPI (Bank of the Philippine Islands).".to_string(),
                "You provide personalized financial advice based on the user's profile, transaction history, and conversation context.".to_string(),
            ],
            scope_rules: Vec::new(),
            refusal_message: STRICT_REFUSAL.to_string(),
            offline_message: OFFLINE_MESSAGE.to_string(),
            gate_enabled: false,
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Strict => Self::strict(),
            ProfileKind::General => Self::general(),
        }
    }
}

impl Default for AssistantProfile {
    fn default() -> Self {
        Self::strict()
    }
}

/// Everything the prompt is built from for one turn
pub struct PromptContext<'a> {
    pub profile: &'a AssistantProfile,
    pub risk: RiskLevel,
    pub persona: Option<&'a Persona>,
    pub financial_summary: Option<&'a FinancialSummary>,
    pub conversation: &'a Conversation,
}

/// Sections in fixed order, empty ones skipped, joined by a blank line
pub fn build_system_prompt(ctx: &PromptContext<'_>) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.extend(ctx.profile.description.iter().cloned());
    sections.extend(ctx.profile.scope_rules.iter().cloned());
    sections.push(risk_directive(ctx.risk).to_string());
    sections.push(ctx.persona.map(persona_line).unwrap_or_default());
    sections.push(ctx.financial_summary.map(financial_line).unwrap_or_default());
    sections.push(recent_context_line(ctx.conversation));
    sections.push(CLOSING_DIRECTIVE.to_string());

    sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn risk_directive(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => HIGH_RISK_DIRECTIVE,
        RiskLevel::Medium => MEDIUM_RISK_DIRECTIVE,
        RiskLevel::Low => "",
    }
}

fn persona_line(persona: &Persona) -> String {
    format!(
        "USER PERSONA: Name: {}, Communication Style: {}, Risk Tolerance: {}, Goals: {}, Preferred Channels: {}",
        persona.name,
        persona.tone_preference,
        persona.risk_affinity,
        persona.goals.join(", "),
        persona
            .contact_channels
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn financial_line(summary: &FinancialSummary) -> String {
    let categories = if summary.top_categories.is_empty() {
        "N/A".to_string()
    } else {
        summary
            .top_categories
            .iter()
            .map(|c| format!("{} ({})", c.category, peso(c.amount)))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "FINANCIAL CONTEXT: Monthly Income: {}, Monthly Expenses: {}, Net Position: {}, Top Spending Categories: {}",
        peso(summary.total_income),
        peso(summary.total_expenses),
        peso(summary.net_worth),
        categories,
    )
}

fn recent_context_line(conversation: &Conversation) -> String {
    let window = conversation.recent(CONTEXT_WINDOW);
    if window.is_empty() {
        return String::new();
    }

    let start = window.len().saturating_sub(RECENT_CONTEXT);
    let recent = window[start..]
        .iter()
        .map(|u| u.content.as_str())
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        "RECENT CONVERSATION CONTEXT: The user has been discussing: {}",
        recent
    )
}

fn peso(amount: Option<f64>) -> String {
    match amount {
        Some(value) if value.is_finite() => format!("₱{}", group_thousands(value)),
        _ => "N/A".to_string(),
    }
}

/// `1234567.5` → `1,234,567.5`; at most two decimals
fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let fraction = fraction.trim_end_matches('0');
    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };

    if fraction.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, fraction)
    }
}
