//! Domain Gate
//!
//! Decides whether an utterance is in scope (personal/business finance,
//! banking products) before any costly work is done.
//!
//! Policy, first match wins:
//! 1. greeting/acknowledgement phrase (exact) → allow
//! 2. off-topic category pattern → reject
//! 3. financial keyword or contextual money pattern → allow
//! 4. otherwise → reject

use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

const GREETINGS: &[&str] = &[
    "hello", "hi", "hey", "good morning", "good afternoon", "good evening",
    "how are you", "thanks", "thank you", "please", "excuse me",
    "yes", "no", "okay", "ok", "sure", "alright",
];

const FINANCIAL_KEYWORDS: &[&str] = &[
    // Banking terms
    "bank", "banking", "account", "balance", "deposit", "withdraw", "transfer", "atm",
    "savings", "checking", "loan", "credit", "debit", "card", "payment", "transaction",
    // Money and currency
    "money", "cash", "peso", "pesos", "₱", "dollar", "currency", "amount", "cost",
    "price", "pay", "paid", "spend", "spending", "expense", "expenses", "income",
    "salary", "wage",
    // Financial planning
    "budget", "budgeting", "save", "saving", "invest", "investment", "portfolio", "fund",
    "emergency fund", "retirement", "pension", "insurance", "financial", "finance",
    // Financial products
    "mortgage", "home loan", "personal loan", "auto loan", "credit card", "time deposit",
    "mutual fund", "stocks", "bonds", "crypto", "cryptocurrency", "remittance",
    // Goals and concerns
    "debt", "bills", "utilities", "rent", "tuition", "education fund", "travel fund",
    "wedding fund", "business capital", "startup", "freelance", "side hustle",
    // Actions
    "borrow", "lend", "refinance", "consolidate", "payoff", "interest", "rate", "apr",
    "fee", "charge", "penalty", "reward", "cashback", "points", "miles",
    // Planning concepts
    "goal", "goals", "plan", "planning", "strategy", "advice", "guidance", "help",
    "recommend", "suggestion", "tip", "tips", "should i", "how to", "what if",
    // Bank specific
    "bpi", "bank of the philippine islands", "expressnet", "online banking",
    "mobile banking",
];

const OFF_TOPIC_PATTERNS: &[&str] = &[
    r"(?i)\b(weather|sports|movies|music|food|recipe|cooking|travel|vacation|health|medical|doctor|hospital)\b",
    r"(?i)\b(politics|government|election|president|mayor|senator)\b",
    r"(?i)\b(technology|programming|coding|software|hardware|computer|phone|app)\b",
    r"(?i)\b(education|school|university|college|teacher|student|homework|exam)\b",
    r"(?i)\b(entertainment|celebrity|actor|actress|singer|artist|game|gaming)\b",
    r"(?i)\b(relationship|dating|marriage|family|friend|love|romance)\b",
    r"(?i)\b(religion|church|prayer|god|jesus|bible|spiritual)\b",
    r"(?i)\b(science|physics|chemistry|biology|math|mathematics|history)\b",
];

const CONTEXT_PATTERNS: &[&str] = &[
    // advice phrase ... money noun
    r"(?i)\b(should i|how to|what if|can i|is it good|is it bad|advice|help|recommend)\b.*\b(money|financial|bank|pay|buy|invest|save|spend|loan|credit)\b",
    // money noun ... advice phrase
    r"(?i)\b(money|financial|bank|pay|buy|invest|save|spend|loan|credit)\b.*\b(should i|how to|what if|can i|is it good|is it bad|advice|help|recommend)\b",
    // amounts: "500 pesos", "20 dollars"
    r"(?i)\b\d[\d,]*(\.\d+)?\s*(peso|pesos|php|dollars?)\b",
    // amounts: "₱50,000", "php 1200"
    r"(?i)(₱|\bphp)\s*\d",
    r"(?i)\b(monthly|annual|yearly|daily|weekly)\s*(income|expense|payment|budget|saving)",
];

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("built-in gate pattern must compile"))
        .collect()
}

lazy_static! {
    static ref DEFAULT_RULES: Arc<GateRules> = Arc::new(GateRules {
        greetings: GREETINGS.iter().map(|s| s.to_string()).collect(),
        off_topic: compile_all(OFF_TOPIC_PATTERNS),
        financial_keywords: FINANCIAL_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        context_patterns: compile_all(CONTEXT_PATTERNS),
    });
}

/// Gate tables. Keywords and greetings must be lower-case.
#[derive(Debug, Clone)]
pub struct GateRules {
    pub greetings: Vec<String>,
    pub off_topic: Vec<Regex>,
    pub financial_keywords: Vec<String>,
    pub context_patterns: Vec<Regex>,
}

impl GateRules {
    /// Build custom tables, rejecting invalid patterns up front
    pub fn new(
        greetings: Vec<String>,
        off_topic: &[&str],
        financial_keywords: Vec<String>,
        context_patterns: &[&str],
    ) -> Result<Self, regex::Error> {
        let compile = |patterns: &[&str]| -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| Regex::new(p)).collect()
        };

        Ok(Self {
            greetings,
            off_topic: compile(off_topic)?,
            financial_keywords,
            context_patterns: compile(context_patterns)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DomainGate {
    rules: Arc<GateRules>,
}

impl DomainGate {
    pub fn new() -> Self {
        Self {
            rules: Arc::clone(&DEFAULT_RULES),
        }
    }

    pub fn with_rules(rules: GateRules) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// `true` when the utterance may be answered
    pub fn allows(&self, text: &str) -> bool {
        let normalized = text.trim().to_lowercase();

        if self.rules.greetings.iter().any(|g| *g == normalized) {
            return true;
        }

        if self.rules.off_topic.iter().any(|re| re.is_match(&normalized)) {
            return false;
        }

        self.rules
            .financial_keywords
            .iter()
            .any(|kw| normalized.contains(kw.as_str()))
            || self
                .rules
                .context_patterns
                .iter()
                .any(|re| re.is_match(&normalized))
    }
}

impl Default for DomainGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greetings_allowed() {
        let gate = DomainGate::new();
        for g in ["hello", "  Hi ", "THANK YOU", "ok"] {
            assert!(gate.allows(g), "{g:?} should pass");
        }
    }

    #[test]
    fn test_greeting_must_be_exact() {
        // "hello there" is neither an exact greeting nor financial
        assert!(!DomainGate::new().allows("hello there"));
    }

    #[test]
    fn test_off_topic_rejected() {
        let gate = DomainGate::new();
        assert!(!gate.allows("what's the weather today"));
        assert!(!gate.allows("what's a good recipe for pasta"));
        assert!(!gate.allows("who won the election"));
    }

    #[test]
    fn test_off_topic_wins_over_keywords() {
        // "budget" is financial, but "travel" is checked first
        assert!(!DomainGate::new().allows("budget travel tips for Japan"));
    }

    #[test]
    fn test_financial_queries_allowed() {
        let gate = DomainGate::new();
        assert!(gate.allows("should I get a personal loan for ₱50,000?"));
        assert!(gate.allows("How do I open a savings account?"));
        assert!(gate.allows("I'm panicking about my credit card debt!!"));
    }

    #[test]
    fn test_contextual_patterns() {
        let gate = DomainGate::new();
        // "buy" is not a keyword; the advice + money-verb pattern carries it
        assert!(gate.allows("is it good to buy a condo now"));
        assert!(gate.allows("I have 300 php left"));
        assert!(gate.allows("php 1200 is all I have"));
    }

    #[test]
    fn test_default_reject() {
        assert!(!DomainGate::new().allows("tell me a joke"));
        assert!(!DomainGate::new().allows(""));
    }

    #[test]
    fn test_custom_rules() {
        let rules = GateRules::new(
            vec!["kumusta".into()],
            &[r"(?i)\bbasketball\b"],
            vec!["utang".into()],
            &[],
        )
        .unwrap();
        let gate = DomainGate::with_rules(rules);

        assert!(gate.allows("Kumusta"));
        assert!(gate.allows("paano bayaran ang utang"));
        assert!(!gate.allows("basketball utang"));
        assert!(!gate.allows("loan"));
    }

    #[test]
    fn test_invalid_custom_pattern() {
        assert!(GateRules::new(vec![], &["(unclosed"], vec![], &[]).is_err());
    }
}
