//! FAQ Retriever
//!
//! Zero-cost fallback answers: Jaccard similarity between the query's
//! token set and each corpus question's token set.

pub mod corpus;

pub use corpus::{load_corpus, parse_csv};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::guard::DomainGate;

pub const DEFAULT_THRESHOLD: f64 = 0.4;

const DEFAULT_REFUSAL: &str = "I'm PersonaForge AI, specialized in banking and financial services. I can only help with questions about banking, investments, loans, budgeting, savings, insurance, and other financial matters. Please ask me about your financial needs.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaqEntry {
    pub q: String,
    pub a: String,
}

/// Outcome of a lookup. `NoMatch` is distinct from a matched empty answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaqAnswer {
    Matched(String),
    Refused(String),
    NoMatch,
}

impl FaqAnswer {
    pub fn into_text(self) -> Option<String> {
        match self {
            FaqAnswer::Matched(text) | FaqAnswer::Refused(text) => Some(text),
            FaqAnswer::NoMatch => None,
        }
    }
}

struct IndexedEntry {
    tokens: HashSet<String>,
    answer: String,
}

/// Read-only after construction; share behind an `Arc`
pub struct FaqRetriever {
    entries: Vec<IndexedEntry>,
    threshold: f64,
    gate: DomainGate,
    refusal: String,
}

impl FaqRetriever {
    pub fn new(corpus: Vec<FaqEntry>) -> Self {
        let entries = corpus
            .into_iter()
            .map(|entry| IndexedEntry {
                tokens: tokenize(&entry.q),
                answer: entry.a,
            })
            .collect();

        Self {
            entries,
            threshold: DEFAULT_THRESHOLD,
            gate: DomainGate::new(),
            refusal: DEFAULT_REFUSAL.to_string(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_gate(mut self, gate: DomainGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_refusal(mut self, refusal: impl Into<String>) -> Self {
        self.refusal = refusal.into();
        self
    }

    /// Scope gate shared with the online path
    pub fn gate(&self) -> &DomainGate {
        &self.gate
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best answer for `query`, or `NoMatch` below the threshold
    pub fn find(&self, query: &str) -> FaqAnswer {
        if self.entries.is_empty() {
            return FaqAnswer::NoMatch;
        }

        if !self.gate.allows(query) {
            return FaqAnswer::Refused(self.refusal.clone());
        }

        let query_tokens = tokenize(query);

        let mut best: Option<(f64, &IndexedEntry)> = None;
        for entry in &self.entries {
            let score = jaccard(&entry.tokens, &query_tokens);
            // Strictly greater: ties keep the earlier entry
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, entry));
            }
        }

        match best {
            Some((score, entry)) if score >= self.threshold => {
                debug!(score, "FAQ match");
                FaqAnswer::Matched(entry.answer.clone())
            }
            Some((score, _)) => {
                debug!(score, threshold = self.threshold, "FAQ best score below threshold");
                FaqAnswer::NoMatch
            }
            None => FaqAnswer::NoMatch,
        }
    }
}

/// Lower-case, non-alphanumerics to spaces, split, dedupe
fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.union(b).count().max(1);
    intersection as f64 / union as f64
}
