//! Conversation window helpers
//!
//! An ordered, append-only list of utterances plus the slicing the
//! orchestrator needs for prompts.

use serde::{Deserialize, Serialize};

use crate::models::{Role, Utterance};

/// Utterances kept as conversation context for one turn
pub const CONTEXT_WINDOW: usize = 10;

/// Utterances quoted in the prompt's recent-context line
pub const RECENT_CONTEXT: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Conversation {
    utterances: Vec<Utterance>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, utterance: Utterance) {
        self.utterances.push(utterance);
    }

    /// Most recent user utterance
    pub fn last_user(&self) -> Option<&Utterance> {
        self.utterances.iter().rev().find(|u| u.role == Role::User)
    }

    /// The `count` most recent utterances, oldest first
    pub fn recent(&self, count: usize) -> &[Utterance] {
        let start = self.utterances.len().saturating_sub(count);
        &self.utterances[start..]
    }

    /// Every utterance as `User: ...` / `Assistant: ...`, one per line
    pub fn transcript(&self) -> String {
        self.utterances
            .iter()
            .map(|u| format!("{}: {}", speaker(u.role), u.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

impl From<Vec<Utterance>> for Conversation {
    fn from(utterances: Vec<Utterance>) -> Self {
        Self { utterances }
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(turns: usize) -> Conversation {
        let mut conversation = Conversation::new();
        for i in 0..turns {
            conversation.push(Utterance::user(format!("question {}", i)));
            conversation.push(Utterance::assistant(format!("answer {}", i)));
        }
        conversation
    }

    #[test]
    fn test_transcript_format() {
        let conversation = Conversation::from(vec![
            Utterance::user("What is APR?"),
            Utterance::assistant("The yearly cost of credit."),
        ]);

        assert_eq!(
            conversation.transcript(),
            "User: What is APR?\nAssistant: The yearly cost of credit."
        );
    }

    #[test]
    fn test_recent_window() {
        let conversation = sample(8);
        let recent = conversation.recent(CONTEXT_WINDOW);

        assert_eq!(recent.len(), 10);
        assert_eq!(recent.last().unwrap().content, "answer 7");
        assert_eq!(recent.first().unwrap().content, "question 3");

        // Shorter than the window: everything
        assert_eq!(sample(1).recent(CONTEXT_WINDOW).len(), 2);
        assert!(Conversation::new().recent(RECENT_CONTEXT).is_empty());
    }

    #[test]
    fn test_last_user() {
        let conversation = sample(2);
        assert_eq!(conversation.last_user().unwrap().content, "question 1");

        let only_assistant = Conversation::from(vec![Utterance::assistant("hi there")]);
        assert!(only_assistant.last_user().is_none());
    }

    #[test]
    fn test_wire_format_is_plain_array() {
        let conversation: Conversation =
            serde_json::from_str(r#"[{"role":"user","content":"hello"}]"#).unwrap();
        assert_eq!(conversation.len(), 1);
        assert!(!conversation.is_empty());
    }
}
